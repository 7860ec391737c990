//! 코퍼스 인덱스 - 파일 코퍼스 + 웹 추출 결과를 하나의 `CorpusStore`에 유지
//!
//! 웹 소스는 검색 시마다 (캐시를 거쳐) 다시 가져오고, fetch 시각이
//! 바뀐 소스만 다시 추출해서 슬라이스를 통째로 교체합니다.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::extractor::{Extractor, GrammarParser};
use crate::knowledge::{dedup_items, rank, Corpus, CorpusStore, Document, QaItem};
use crate::scraper::{fetch_all, ContentSource};

/// 소스 하나의 갱신 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// 새로 추출됨
    Extracted { items: usize },
    /// 같은 문서라 기존 레코드 유지
    Unchanged,
    /// fetch 실패 (기존 레코드 유지)
    Failed { cause: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub outcome: SourceOutcome,
}

/// 웹 + 파일 코퍼스 인덱스
pub struct CorpusIndex {
    source: Arc<dyn ContentSource>,
    web_sources: Vec<String>,
    workers: usize,
    store: CorpusStore,
    extractor: Extractor,
}

impl CorpusIndex {
    pub fn new(source: Arc<dyn ContentSource>, web_sources: Vec<String>, workers: usize) -> Self {
        Self {
            source,
            web_sources,
            workers,
            store: CorpusStore::new(),
            extractor: Extractor::new(),
        }
    }

    /// 로컬 코퍼스 문서를 문법 파서로 파싱해서 등록
    pub fn load_file_corpus(&self, doc: &Document) -> Result<usize> {
        let items = dedup_items(GrammarParser::new().parse(doc));
        let count = items.len();
        self.store.replace_source(&doc.source_id, items, doc.fetched_at)?;
        tracing::info!("Loaded {} FAQ items from {}", count, doc.source_id);
        Ok(count)
    }

    /// 모든 웹 소스 갱신
    pub async fn refresh(&self) -> Result<Vec<SourceReport>> {
        let results = fetch_all(self.source.as_ref(), &self.web_sources, self.workers).await;
        let mut reports = Vec::with_capacity(results.len());

        for (source_id, result) in self.web_sources.iter().zip(results) {
            let outcome = match result {
                Ok(doc) if self.store.is_current(&doc.source_id, doc.fetched_at)? => {
                    SourceOutcome::Unchanged
                }
                Ok(doc) => {
                    let items = self.extractor.extract(&doc);
                    let count = items.len();
                    self.store.replace_source(&doc.source_id, items, doc.fetched_at)?;
                    SourceOutcome::Extracted { items: count }
                }
                Err(e) => SourceOutcome::Failed {
                    cause: e.to_string(),
                },
            };

            reports.push(SourceReport {
                source_id: source_id.clone(),
                outcome,
            });
        }

        Ok(reports)
    }

    /// 현재 코퍼스
    pub fn snapshot(&self) -> Result<Corpus> {
        self.store.snapshot()
    }

    /// 갱신 후 랭킹
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<QaItem>> {
        self.refresh().await?;
        let corpus = self.snapshot()?;
        Ok(rank(&corpus, query, limit))
    }
}

// ============================================================================
// Tests
// ============================================================================
