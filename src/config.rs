//! 설정 모듈 - 환경변수 기반 설정 로드
//!
//! 모든 값은 환경변수에서 읽고, 없으면 기본값을 사용합니다.
//! `AI_BASE_URL`이 없으면 외부 모델 호출 없이 후보 답변을 그대로 반환합니다.

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// 캐시 유효 시간 (1시간)
pub const CACHE_TTL_SECS: i64 = 3600;

/// 일반 폴백 전략이 담는 최대 본문 길이
pub const MAX_CONTENT_LENGTH: usize = 15_000;

/// 요청 식별용 User-Agent (일부 정부 사이트가 비브라우저 UA를 차단함)
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const DEFAULT_MODEL: &str = "Qwen3-14B";
const DEFAULT_API_KEY: &str = "not-needed-for-vllm";
const DEFAULT_FAQ_FILE: &str = "faq.txt";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_WORKERS: usize = 5;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;

/// 기본 FAQ 웹사이트 목록
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://www.moha.gov.my/index.php/ms/soalan-lazim",
    "https://www.rela.gov.my/?page_id=4621",
    "https://www.jpn.gov.my/my/soalan-lazim/soalan-lazim-kad-pengenalan",
    "https://www.ros.gov.my/portal-main/faq",
    "https://www.prison.gov.my/ms/article-news/176-informasi/70-soalan-lazim",
    "https://www.mmea.gov.my/index.php/ms/44-soalan-lazim?layout=*",
    "https://www.rmp.gov.my/faq",
    "https://www.aadk.gov.my/en/faq/",
    "https://mcba.moha.gov.my/ms/component/content/article/333-soalan-lazim.html?catid=2",
];

// ============================================================================
// Config
// ============================================================================

/// 생성 모델 접속 설정
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// 모델 서버 주소 (예: http://localhost:8000)
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 로컬 FAQ 코퍼스 파일 (또는 디렉토리)
    pub faq_file: PathBuf,
    /// 크롤링 대상 URL 목록
    pub sources: Vec<String>,
    /// 요청당 타임아웃
    pub fetch_timeout: Duration,
    /// 동시 fetch 워커 수
    pub fetch_workers: usize,
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            faq_file: PathBuf::from(DEFAULT_FAQ_FILE),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_workers: DEFAULT_FETCH_WORKERS,
            model: ModelConfig {
                base_url: None,
                model: DEFAULT_MODEL.to_string(),
                api_key: DEFAULT_API_KEY.to_string(),
                timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            },
        }
    }
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// 지원 변수: `AI_BASE_URL`, `AI_MODEL`, `AI_API_KEY`, `FAQ_FILE`,
    /// `FAQ_SOURCES` (쉼표 구분), `FETCH_TIMEOUT_SECS`, `FETCH_WORKERS`,
    /// `MODEL_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 로드 (테스트용 주입 지점)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("AI_BASE_URL") {
            config.model.base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(model) = get("AI_MODEL") {
            config.model.model = model;
        }
        if let Some(key) = get("AI_API_KEY") {
            config.model.api_key = key;
        }
        if let Some(path) = get("FAQ_FILE") {
            config.faq_file = PathBuf::from(path);
        }
        if let Some(sources) = get("FAQ_SOURCES") {
            let parsed: Vec<String> = sources
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.sources = parsed;
            }
        }
        if let Some(secs) = get("FETCH_TIMEOUT_SECS").and_then(|v| parse_number(&v)) {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(workers) = get("FETCH_WORKERS").and_then(|v| parse_number(&v)) {
            config.fetch_workers = (workers as usize).max(1);
        }
        if let Some(secs) = get("MODEL_TIMEOUT_SECS").and_then(|v| parse_number(&v)) {
            config.model.timeout = Duration::from_secs(secs);
        }

        config
    }

    /// 모델 서버가 설정되었는지 여부
    pub fn has_model(&self) -> bool {
        self.model.base_url.is_some()
    }
}

fn parse_number(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("Ignoring invalid numeric setting {:?}: {}", value, e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.fetch_workers, 5);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.model.timeout, Duration::from_secs(30));
        assert_eq!(config.sources.len(), DEFAULT_SOURCES.len());
        assert!(!config.has_model());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("AI_BASE_URL", "http://localhost:8000/"),
            ("AI_MODEL", "llama3"),
            ("FAQ_SOURCES", "https://a.gov.my/faq, https://b.gov.my/faq ,"),
            ("FETCH_WORKERS", "0"),
            ("FETCH_TIMEOUT_SECS", "abc"),
        ]));

        assert_eq!(config.model.base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.model.model, "llama3");
        assert_eq!(
            config.sources,
            vec!["https://a.gov.my/faq".to_string(), "https://b.gov.my/faq".to_string()]
        );
        // 0은 1로 보정
        assert_eq!(config.fetch_workers, 1);
        // 잘못된 값은 무시
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.has_model());
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = Config::from_lookup(lookup_from(&[("AI_BASE_URL", "  ")]));
        assert!(!config.has_model());
    }
}
