//! Answer 모듈 - 쿼리 하나를 최종 답변으로
//!
//! 구성:
//! - `critical`: 핵심 답변/패턴/연락처 고정 테이블
//! - `corpus`: 파일 + 웹 코퍼스 인덱스
//! - `tiers`: 5계층 폴백 오케스트레이터
//! - `synthesizer`: 생성 모델로 답변 합성 (실패 시 후보 본문 그대로)
//!
//! `AnswerService::answer`는 실패하지 않습니다. 내부에서 모든 계층이
//! 실패해도 일반 연락처 안내가 반환됩니다.

pub mod corpus;
pub mod critical;
pub mod synthesizer;
pub mod tiers;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::deep_search::DeepSearcher;
use crate::knowledge::{AnswerMethod, FormattedAnswer};
use crate::llm::{GenerativeModelClient, OpenAiCompatClient};
use crate::scraper::{CachedSource, ContentSource, FileSource, WebScraper};

pub use corpus::{CorpusIndex, SourceOutcome, SourceReport};
pub use critical::{FALLBACK_SYSTEM_SOURCE, GENERAL_FALLBACK_BODY, GENERAL_FALLBACK_SOURCE};
pub use synthesizer::Synthesizer;
pub use tiers::{Grounding, Orchestrator, Tier, TierOutcome};

/// 응답 + 어느 계층이 답했는지
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub answer: FormattedAnswer,
    /// 모든 계층이 실패하면 `None`
    pub method: Option<AnswerMethod>,
    pub confidence: f64,
}

/// 캐시된 웹 소스 + 로컬 코퍼스로 인덱스 구성
pub async fn build_index(config: &Config, web: Arc<dyn ContentSource>) -> Arc<CorpusIndex> {
    let index = CorpusIndex::new(web, config.sources.clone(), config.fetch_workers);

    match load_corpus_document(&config.faq_file).await {
        Ok(doc) => {
            if let Err(e) = index.load_file_corpus(&doc) {
                tracing::warn!("Failed to index {}: {:#}", config.faq_file.display(), e);
            }
        }
        // 로컬 코퍼스가 없어도 웹 소스만으로 동작
        Err(e) => tracing::warn!("{:#}", e),
    }

    Arc::new(index)
}

async fn load_corpus_document(path: &Path) -> Result<crate::knowledge::Document> {
    let source_id = path.to_string_lossy();
    FileSource
        .fetch(&source_id)
        .await
        .with_context(|| format!("Local FAQ corpus unavailable: {}", path.display()))
}

/// 캐시를 씌운 웹 소스
pub fn cached_web_source(config: &Config) -> Result<Arc<dyn ContentSource>> {
    let scraper = WebScraper::from_config(config)?;
    Ok(Arc::new(CachedSource::new(scraper)))
}

/// 질의응답 서비스
pub struct AnswerService {
    orchestrator: Orchestrator,
    synthesizer: Synthesizer,
}

impl AnswerService {
    pub fn with_parts(orchestrator: Orchestrator, synthesizer: Synthesizer) -> Self {
        Self {
            orchestrator,
            synthesizer,
        }
    }

    /// 설정에서 전체 파이프라인 구성
    pub async fn from_config(config: &Config) -> Result<Self> {
        let web = cached_web_source(config)?;
        let searcher = DeepSearcher::new(Arc::clone(&web), config.sources.clone(), config.fetch_workers);
        let index = build_index(config, web).await;

        let client: Option<Arc<dyn GenerativeModelClient>> = if config.has_model() {
            let client = OpenAiCompatClient::from_config(&config.model)
                .context("Failed to create model client")?;
            Some(Arc::new(client))
        } else {
            tracing::info!("AI_BASE_URL not set, answers are returned without synthesis");
            None
        };

        Ok(Self::with_parts(
            Orchestrator::standard(searcher, index),
            Synthesizer::new(client),
        ))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// 쿼리 응답 (계층 정보 포함)
    pub async fn respond(&self, query: &str) -> Response {
        let query = query.trim();

        let Some(outcome) = self.orchestrator.resolve(query).await else {
            tracing::warn!("All tiers failed for {:?}", query);
            return Response {
                answer: total_failure_answer(),
                method: None,
                confidence: 0.0,
            };
        };

        let candidate = &outcome.candidate;
        let answer = match candidate.method {
            AnswerMethod::DeepSearch | AnswerMethod::CorpusSearch => {
                self.synthesizer.synthesize(query, &outcome).await
            }
            AnswerMethod::Critical | AnswerMethod::Pattern | AnswerMethod::Fallback => {
                FormattedAnswer::new(candidate.text.clone(), [candidate.source.clone()])
            }
        };

        Response {
            answer,
            method: Some(candidate.method),
            confidence: candidate.confidence,
        }
    }

    /// 쿼리 응답
    pub async fn answer(&self, query: &str) -> FormattedAnswer {
        self.respond(query).await.answer
    }
}

/// 모든 계층이 실패했을 때의 일반 안내
fn total_failure_answer() -> FormattedAnswer {
    FormattedAnswer::new(GENERAL_FALLBACK_BODY, [FALLBACK_SYSTEM_SOURCE])
}

// ============================================================================
// Tests
// ============================================================================
