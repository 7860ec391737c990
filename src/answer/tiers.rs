//! 계층형 폴백 오케스트레이터
//!
//! 계층은 고정 순서로 평가되며, 각 계층은 후보를 내거나(체인 중단)
//! 거절합니다(다음 계층으로). 계층 내부 에러는 로그만 남기고 거절로 취급합니다.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use super::corpus::CorpusIndex;
use super::critical::{fallback_candidate, match_critical, match_pattern};
use crate::deep_search::{DeepCandidate, DeepSearcher, HIGH_CONFIDENCE};
use crate::knowledge::{AnswerCandidate, AnswerMethod, QaItem};

/// 코퍼스 검색 계층이 답하려면 넘어야 하는 관련도 점수
pub const CORPUS_SCORE_THRESHOLD: f64 = 5.0;

/// 코퍼스 검색 계층의 최대 신뢰도
const CORPUS_MAX_CONFIDENCE: f64 = 0.8;

/// 합성기에 넘기는 근거 레코드 수
pub const MAX_GROUNDING: usize = 5;

// ============================================================================
// Outcome
// ============================================================================

/// 합성기 프롬프트에 들어가는 근거 레코드
#[derive(Debug, Clone, Serialize)]
pub struct Grounding {
    pub source: String,
    pub question: String,
    pub answer: String,
    pub score: f64,
}

impl From<&QaItem> for Grounding {
    fn from(item: &QaItem) -> Self {
        Self {
            source: item.agency_tag.clone(),
            question: item.question.clone(),
            answer: item.answer.clone(),
            score: item.score,
        }
    }
}

impl From<&DeepCandidate> for Grounding {
    fn from(c: &DeepCandidate) -> Self {
        Self {
            source: c.website.clone(),
            question: c.question.clone(),
            answer: c.answer.clone(),
            score: c.confidence,
        }
    }
}

/// 계층 하나의 결과
#[derive(Debug, Clone)]
pub struct TierOutcome {
    pub candidate: AnswerCandidate,
    pub grounding: Vec<Grounding>,
}

impl TierOutcome {
    pub fn bare(candidate: AnswerCandidate) -> Self {
        Self {
            candidate,
            grounding: Vec::new(),
        }
    }
}

// ============================================================================
// Tier Trait
// ============================================================================

/// 결정 계층
#[async_trait]
pub trait Tier: Send + Sync {
    fn name(&self) -> &'static str;

    /// 후보를 내거나(`Some`) 거절(`None`)
    async fn decide(&self, query: &str) -> Result<Option<TierOutcome>>;
}

/// 1. 핵심 답변 (키워드 3개 이상)
pub struct CriticalTier;

#[async_trait]
impl Tier for CriticalTier {
    fn name(&self) -> &'static str {
        "critical"
    }

    async fn decide(&self, query: &str) -> Result<Option<TierOutcome>> {
        Ok(match_critical(query).map(TierOutcome::bare))
    }
}

/// 2. 패턴 매핑
pub struct PatternTier;

#[async_trait]
impl Tier for PatternTier {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn decide(&self, query: &str) -> Result<Option<TierOutcome>> {
        Ok(match_pattern(query).map(TierOutcome::bare))
    }
}

/// 3. 딥서치 (최고 신뢰도 0.7 이상)
pub struct DeepSearchTier {
    searcher: DeepSearcher,
}

impl DeepSearchTier {
    pub fn new(searcher: DeepSearcher) -> Self {
        Self { searcher }
    }
}

#[async_trait]
impl Tier for DeepSearchTier {
    fn name(&self) -> &'static str {
        "deep_search"
    }

    async fn decide(&self, query: &str) -> Result<Option<TierOutcome>> {
        let results = self.searcher.search(query).await;
        let Some(best) = results.first() else {
            return Ok(None);
        };
        if best.confidence < HIGH_CONFIDENCE {
            tracing::debug!("Deep search best confidence {:.2} too low", best.confidence);
            return Ok(None);
        }

        Ok(Some(TierOutcome {
            candidate: best.to_candidate(),
            grounding: results.iter().take(MAX_GROUNDING).map(Grounding::from).collect(),
        }))
    }
}

/// 4. 코퍼스 관련도 검색 (최고 점수 5 초과)
pub struct CorpusSearchTier {
    index: Arc<CorpusIndex>,
}

impl CorpusSearchTier {
    pub fn new(index: Arc<CorpusIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tier for CorpusSearchTier {
    fn name(&self) -> &'static str {
        "corpus_search"
    }

    async fn decide(&self, query: &str) -> Result<Option<TierOutcome>> {
        let ranked = self.index.search(query, MAX_GROUNDING).await?;
        let Some(best) = ranked.first() else {
            return Ok(None);
        };
        if best.score <= CORPUS_SCORE_THRESHOLD {
            tracing::debug!("Corpus search best score {:.1} too low", best.score);
            return Ok(None);
        }

        let confidence = (best.score / 10.0).min(CORPUS_MAX_CONFIDENCE);
        Ok(Some(TierOutcome {
            candidate: AnswerCandidate::new(
                best.answer.clone(),
                best.agency_tag.clone(),
                confidence,
                AnswerMethod::CorpusSearch,
            ),
            grounding: ranked.iter().map(Grounding::from).collect(),
        }))
    }
}

/// 5. 일반 폴백 (항상 성공)
pub struct FallbackTier;

#[async_trait]
impl Tier for FallbackTier {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn decide(&self, _query: &str) -> Result<Option<TierOutcome>> {
        Ok(Some(TierOutcome::bare(fallback_candidate())))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// 순서가 있는 계층 체인
pub struct Orchestrator {
    tiers: Vec<Box<dyn Tier>>,
}

impl Orchestrator {
    pub fn new(tiers: Vec<Box<dyn Tier>>) -> Self {
        Self { tiers }
    }

    /// 표준 5계층 체인
    pub fn standard(searcher: DeepSearcher, index: Arc<CorpusIndex>) -> Self {
        Self::new(vec![
            Box::new(CriticalTier),
            Box::new(PatternTier),
            Box::new(DeepSearchTier::new(searcher)),
            Box::new(CorpusSearchTier::new(index)),
            Box::new(FallbackTier),
        ])
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// 첫 번째로 답한 계층의 결과 (모두 거절/실패하면 `None`)
    pub async fn resolve(&self, query: &str) -> Option<TierOutcome> {
        for tier in &self.tiers {
            match tier.decide(query).await {
                Ok(Some(outcome)) => {
                    tracing::info!(
                        "Tier {} answered (confidence {:.2})",
                        tier.name(),
                        outcome.candidate.confidence
                    );
                    return Some(outcome);
                }
                Ok(None) => tracing::debug!("Tier {} declined", tier.name()),
                Err(e) => tracing::warn!("Tier {} failed: {:#}", tier.name(), e),
            }
        }

        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingTier;

    #[async_trait]
    impl Tier for FailingTier {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn decide(&self, _query: &str) -> Result<Option<TierOutcome>> {
            anyhow::bail!("index unavailable")
        }
    }

    struct CountingTier {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tier for CountingTier {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn decide(&self, _query: &str) -> Result<Option<TierOutcome>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_failing_tier_falls_through() {
        let orchestrator = Orchestrator::new(vec![Box::new(FailingTier), Box::new(FallbackTier)]);
        let outcome = orchestrator.resolve("apa-apa").await.expect("fallback answers");
        assert_eq!(outcome.candidate.method, AnswerMethod::Fallback);
    }

    #[tokio::test]
    async fn test_short_circuit_on_first_answer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = Orchestrator::new(vec![
            Box::new(CriticalTier),
            Box::new(CountingTier {
                calls: Arc::clone(&calls),
            }),
            Box::new(FallbackTier),
        ]);

        let outcome = orchestrator
            .resolve("Berapa bayaran jika cip IC rosak?")
            .await
            .expect("critical answers");
        assert_eq!(outcome.candidate.method, AnswerMethod::Critical);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let outcome = orchestrator.resolve("waktu operasi").await.expect("fallback answers");
        assert_eq!(outcome.candidate.method, AnswerMethod::Fallback);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_declined() {
        let orchestrator = Orchestrator::new(vec![Box::new(PatternTier), Box::new(FailingTier)]);
        assert!(orchestrator.resolve("waktu operasi").await.is_none());
    }

    #[test]
    fn test_grounding_from_item() {
        let mut item = QaItem::new("Apakah MyKad?", "Kad pengenalan.", "faq.txt", "JPN").expect("item");
        item.score = 12.0;
        let grounding = Grounding::from(&item);
        assert_eq!(grounding.source, "JPN");
        assert_eq!(grounding.score, 12.0);
    }
}
