//! TTL fetch 캐시
//!
//! source_id → 마지막으로 성공한 문서. 나이가 TTL 미만이면 재사용하고,
//! 그렇지 않으면 다시 가져옵니다. 실패는 캐시하지 않습니다.
//! 동시 갱신은 마지막 쓰기가 이깁니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::ContentSource;
use crate::config::CACHE_TTL_SECS;
use crate::error::FetchError;
use crate::knowledge::Document;

/// 현재 시각 공급자 (테스트에서 시간 조작용)
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// TTL 캐시
pub struct FetchCache {
    entries: Mutex<HashMap<String, Document>>,
    ttl: chrono::Duration,
    clock: Clock,
}

impl FetchCache {
    /// 기본 TTL(1시간) + 시스템 시계
    pub fn new() -> Self {
        Self::with_clock(CACHE_TTL_SECS, Arc::new(Utc::now))
    }

    pub fn with_clock(ttl_secs: i64, clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::seconds(ttl_secs),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Document>> {
        // 패닉 후에도 캐시 내용은 일관됨 (문서 단위 삽입만 수행)
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// TTL 안의 문서만 반환
    pub fn get(&self, source_id: &str) -> Option<Document> {
        let now = self.now();
        self.lock()
            .get(source_id)
            .filter(|doc| now.signed_duration_since(doc.fetched_at) < self.ttl)
            .cloned()
    }

    pub fn put(&self, doc: Document) {
        self.lock().insert(doc.source_id.clone(), doc);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CachedSource
// ============================================================================

/// 캐시를 앞에 둔 콘텐츠 소스
pub struct CachedSource<S> {
    inner: S,
    cache: FetchCache,
}

impl<S: ContentSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_cache(inner, FetchCache::new())
    }

    pub fn with_cache(inner: S, cache: FetchCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }
}

#[async_trait]
impl<S: ContentSource> ContentSource for CachedSource<S> {
    async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
        if let Some(doc) = self.cache.get(source_id) {
            tracing::debug!("Cache hit: {}", source_id);
            return Ok(doc);
        }

        let mut doc = self.inner.fetch(source_id).await?;
        doc.fetched_at = self.cache.now();
        self.cache.put(doc.clone());
        Ok(doc)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    const T0: i64 = 1_700_000_000;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if source_id.contains("broken") {
                return Err(FetchError::Timeout {
                    source_id: source_id.to_string(),
                });
            }
            Ok(Document::new(source_id, format!("body #{}", n)))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn fixture() -> (CachedSource<CountingSource>, Arc<AtomicUsize>, Arc<AtomicI64>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let now = Arc::new(AtomicI64::new(T0));
        let clock_now = Arc::clone(&now);
        let clock: Clock = Arc::new(move || {
            DateTime::from_timestamp(clock_now.load(Ordering::SeqCst), 0).expect("valid timestamp")
        });

        let source = CachedSource::with_cache(
            CountingSource {
                calls: Arc::clone(&calls),
            },
            FetchCache::with_clock(CACHE_TTL_SECS, clock),
        );
        (source, calls, now)
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let (source, calls, now) = fixture();

        let first = source.fetch("https://www.jpn.gov.my").await.expect("fetch");
        now.store(T0 + 1800, Ordering::SeqCst);
        let second = source.fetch("https://www.jpn.gov.my").await.expect("fetch");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let (source, calls, now) = fixture();

        source.fetch("https://www.jpn.gov.my").await.expect("fetch");
        now.store(T0 + 3601, Ordering::SeqCst);
        let refreshed = source.fetch("https://www.jpn.gov.my").await.expect("fetch");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.body, "body #1");
        assert_eq!(refreshed.fetched_at.timestamp(), T0 + 3601);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let (source, calls, _) = fixture();

        assert!(source.fetch("https://broken.gov.my").await.is_err());
        assert!(source.fetch("https://broken.gov.my").await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(source.cache().is_empty());
    }
}
