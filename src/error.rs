//! 에러 타입
//!
//! 소스 단위/전략 단위 실패는 가장 좁은 범위에서 잡혀서
//! "해당 소스에서 0건"으로 강등됩니다. 호출자에게 보이는 실패는 없습니다.

use std::path::PathBuf;

/// 콘텐츠 소스 fetch 실패
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out fetching {source_id}")]
    Timeout { source_id: String },

    #[error("transport error fetching {source_id}: {cause}")]
    Transport { source_id: String, cause: String },

    #[error("HTTP {status} fetching {source_id}")]
    Status { source_id: String, status: u16 },
}

impl FetchError {
    /// 실패한 소스 ID
    pub fn source_id(&self) -> &str {
        match self {
            FetchError::Timeout { source_id }
            | FetchError::Transport { source_id, .. }
            | FetchError::Status { source_id, .. } => source_id,
        }
    }
}

/// 로컬 FAQ 코퍼스 파일 로드 실패
#[derive(Debug, thiserror::Error)]
#[error("failed to load corpus from {path:?}: {cause}")]
pub struct LoadError {
    pub path: PathBuf,
    pub cause: String,
}

/// 단일 문법/전략이 블록 하나에서 실패한 경우 (치명적이지 않음)
#[derive(Debug, thiserror::Error)]
#[error("{what} failed: {cause}")]
pub struct ParseError {
    pub what: String,
    pub cause: String,
}

/// 외부 생성 모델 호출 실패
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model endpoint not configured")]
    NotConfigured,

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparseable model payload: {0}")]
    Payload(String),
}
