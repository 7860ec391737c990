//! 콘텐츠 소스 모듈 - URL/파일에서 원본 문서 가져오기
//!
//! - `WebScraper`: HTTP GET (인증서 검증 완화, 브라우저 UA, 요청당 타임아웃)
//! - `FileSource`: 로컬 코퍼스 파일/디렉토리
//! - `CachedSource`: TTL 캐시 래퍼 (`cache` 참고)
//!
//! 모든 소스는 `ContentSource` 트레이트 뒤에 있으므로 테스트에서는
//! 가짜 구현으로 교체할 수 있습니다.

pub mod cache;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::collector::CorpusFile;
use crate::config::{Config, USER_AGENT};
use crate::error::FetchError;
use crate::knowledge::Document;

pub use cache::{CachedSource, Clock, FetchCache};

// ============================================================================
// ContentSource Trait
// ============================================================================

/// 원본 문서 제공자
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// source_id(URL 또는 경로)로 문서 가져오기
    async fn fetch(&self, source_id: &str) -> Result<Document, FetchError>;

    /// 소스 이름 (로그용)
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for std::sync::Arc<T> {
    async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
        (**self).fetch(source_id).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// 여러 소스를 워커 풀로 동시에 가져오기
///
/// 결과는 입력 순서를 유지합니다. 실패한 소스는 `Err`로 남고
/// 나머지 결과에는 영향을 주지 않습니다.
pub async fn fetch_all<S>(
    source: &S,
    source_ids: &[String],
    workers: usize,
) -> Vec<Result<Document, FetchError>>
where
    S: ContentSource + ?Sized,
{
    let fetches: Vec<_> = source_ids.iter().map(|id| source.fetch(id)).collect();
    let results: Vec<Result<Document, FetchError>> = stream::iter(fetches)
        .buffered(workers.max(1))
        .collect()
        .await;

    for result in &results {
        if let Err(e) = result {
            tracing::warn!("[{}] {}", source.name(), e);
        }
    }

    results
}

// ============================================================================
// WebScraper
// ============================================================================

/// HTTP 웹 스크래퍼
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    ///
    /// 일부 정부 사이트는 인증서 체인이 불완전하므로 검증을 끕니다.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self { client })
    }

    /// 설정의 fetch 타임아웃으로 생성
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.fetch_timeout)
    }
}

fn transport_error(source_id: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            source_id: source_id.to_string(),
        }
    } else {
        FetchError::Transport {
            source_id: source_id.to_string(),
            cause: err.to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for WebScraper {
    async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
        tracing::info!("Scraping: {}", source_id);

        let response = self
            .client
            .get(source_id)
            .send()
            .await
            .map_err(|e| transport_error(source_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_id: source_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(source_id, e))?;

        Ok(Document::new(source_id, body))
    }

    fn name(&self) -> &str {
        "web"
    }
}

// ============================================================================
// FileSource
// ============================================================================

/// 로컬 코퍼스 소스 (source_id = 파일 또는 디렉토리 경로)
#[derive(Debug, Clone, Default)]
pub struct FileSource;

#[async_trait]
impl ContentSource for FileSource {
    async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
        let path = std::path::PathBuf::from(source_id);
        let body = tokio::task::spawn_blocking(move || CorpusFile::load(&path))
            .await
            .map_err(|e| FetchError::Transport {
                source_id: source_id.to_string(),
                cause: e.to_string(),
            })?
            .map_err(|e| FetchError::Transport {
                source_id: source_id.to_string(),
                cause: e.to_string(),
            })?;

        Ok(Document::new(source_id, body))
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FakeWeb;

    #[async_trait]
    impl ContentSource for FakeWeb {
        async fn fetch(&self, source_id: &str) -> Result<Document, FetchError> {
            if source_id.contains("down") {
                return Err(FetchError::Status {
                    source_id: source_id.to_string(),
                    status: 503,
                });
            }
            Ok(Document::new(source_id, format!("<p>{}</p>", source_id)))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn test_scraper_creation() {
        let scraper = WebScraper::new(Duration::from_secs(10));
        assert!(scraper.is_ok());
        assert!(WebScraper::from_config(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_order_and_isolates_failures() {
        let ids: Vec<String> = ["https://a.gov.my", "https://down.gov.my", "https://b.gov.my"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = fetch_all(&FakeWeb, &ids, 5).await;
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().map(|d| d.source_id.as_str()).ok(),
            Some("https://a.gov.my")
        );
        assert!(matches!(
            results[1],
            Err(FetchError::Status { status: 503, .. })
        ));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_fetch_all_with_zero_workers() {
        let ids = vec!["https://a.gov.my".to_string()];
        let results = fetch_all(&FakeWeb, &ids, 0).await;
        assert!(results[0].is_ok());
    }

    #[tokio::test]
    async fn test_file_source_reads_corpus() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "## RELA\nQ: Apakah RELA?\nA: Pasukan sukarelawan.").expect("write");

        let path = file.path().to_string_lossy().to_string();
        let doc = FileSource.fetch(&path).await.expect("fetch file");
        assert!(doc.body.contains("Apakah RELA?"));
        assert_eq!(doc.source_id, path);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let result = FileSource.fetch("/nonexistent/faq.txt").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
