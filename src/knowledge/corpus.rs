//! Corpus - 소스별 Q&A 레코드 저장소
//!
//! 레코드는 source_id별 슬라이스로 저장되고, 재구축은 슬라이스 전체를
//! 한 번에 교체합니다. 부분 갱신은 없습니다.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::question::normalized_key;
use super::QaItem;

// ============================================================================
// Corpus
// ============================================================================

/// 소스 하나의 레코드 묶음
#[derive(Debug, Clone)]
struct SourceSlice {
    source_id: String,
    items: Vec<QaItem>,
}

/// 순서가 보존되는 Q&A 레코드 모음
///
/// 소스 최초 삽입 순서 → 소스 내 추출 순서가 곧 동점 처리 순서입니다.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    slices: Vec<SourceSlice>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 단일 소스의 레코드로 코퍼스 생성
    pub fn from_items(source_id: impl Into<String>, items: Vec<QaItem>) -> Self {
        let mut corpus = Self::new();
        corpus.replace_source(source_id, items);
        corpus
    }

    /// 소스의 레코드를 통째로 교체 (없으면 끝에 추가)
    pub fn replace_source(&mut self, source_id: impl Into<String>, items: Vec<QaItem>) {
        let source_id = source_id.into();
        match self.slices.iter_mut().find(|s| s.source_id == source_id) {
            Some(slice) => slice.items = items,
            None => self.slices.push(SourceSlice { source_id, items }),
        }
    }

    /// 소스 제거
    pub fn remove_source(&mut self, source_id: &str) -> bool {
        let before = self.slices.len();
        self.slices.retain(|s| s.source_id != source_id);
        self.slices.len() != before
    }

    /// 소스별 레코드 조회
    pub fn items_for(&self, source_id: &str) -> &[QaItem] {
        self.slices
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }

    /// 전체 레코드 (코퍼스 순서)
    pub fn iter(&self) -> impl Iterator<Item = &QaItem> {
        self.slices.iter().flat_map(|s| s.items.iter())
    }

    /// 소스 ID 목록 (삽입 순서)
    pub fn sources(&self) -> Vec<&str> {
        self.slices.iter().map(|s| s.source_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slices.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// CorpusStore
// ============================================================================

/// 스레드 안전 코퍼스 저장소
///
/// 소스별 문서 fetch 시각을 기록해서, 캐시된 같은 문서를 다시
/// 추출하지 않도록 합니다.
#[derive(Debug, Default)]
pub struct CorpusStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    corpus: Corpus,
    stamps: HashMap<String, DateTime<Utc>>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 해당 fetch 시각의 문서가 이미 반영되어 있는지
    pub fn is_current(&self, source_id: &str, fetched_at: DateTime<Utc>) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        Ok(inner.stamps.get(source_id) == Some(&fetched_at))
    }

    /// 소스 레코드 원자적 교체
    pub fn replace_source(
        &self,
        source_id: &str,
        items: Vec<QaItem>,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        inner.corpus.replace_source(source_id, items);
        inner.stamps.insert(source_id.to_string(), fetched_at);
        Ok(())
    }

    /// 현재 코퍼스 스냅샷
    pub fn snapshot(&self) -> Result<Corpus> {
        let inner = self
            .inner
            .read()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        Ok(inner.corpus.clone())
    }
}

// ============================================================================
// Dedup
// ============================================================================

/// 정규화된 질문 기준 중복 제거 (처음 나온 레코드 유지)
///
/// 여러 문법이 같은 블록을 중복 추출하는 경우를 정리합니다.
pub fn dedup_items(items: Vec<QaItem>) -> Vec<QaItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.source_id.clone(), normalized_key(&item.question))))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
