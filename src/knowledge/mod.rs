//! Knowledge 모듈 - Q&A 레코드, 코퍼스, 관련도 랭킹
//!
//! 구성:
//! - `question`: "질문처럼 보이는가" 판별 + 텍스트 정리 유틸리티
//! - `corpus`: 소스별 Q&A 레코드 저장 (소스 단위 원자적 교체)
//! - `ranker`: 쿼리 대비 관련도 점수 계산 및 정렬

pub mod corpus;
pub mod question;
pub mod ranker;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use corpus::{dedup_items, Corpus, CorpusStore};
pub use question::{clean_text, contains_term, looks_like_question};
pub use ranker::{rank, rank_items, score_item, DEFAULT_RANK_LIMIT};

// ============================================================================
// Document
// ============================================================================

/// 가져온 원본 문서 (fetch 이후 불변)
#[derive(Debug, Clone)]
pub struct Document {
    /// URL 또는 파일 경로
    pub source_id: String,
    /// 원본 텍스트 (HTML 또는 일반 텍스트)
    pub body: String,
    /// fetch 시각
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    /// 현재 시각으로 문서 생성
    pub fn new(source_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self::fetched_at(source_id, body, Utc::now())
    }

    /// fetch 시각을 지정하여 생성
    pub fn fetched_at(
        source_id: impl Into<String>,
        body: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            body: body.into(),
            fetched_at,
        }
    }

    /// 사이트 이름 (URL이면 호스트, 아니면 source_id 그대로)
    pub fn website(&self) -> String {
        website_of(&self.source_id)
    }
}

/// source_id에서 사이트 이름 추출
pub fn website_of(source_id: &str) -> String {
    url::Url::parse(source_id)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| source_id.to_string())
}

// ============================================================================
// QaItem
// ============================================================================

/// 추출된 질문/답변 레코드
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaItem {
    pub question: String,
    pub answer: String,
    pub source_id: String,
    /// 발행 기관 태그 (JPN, PDRM, 또는 웹사이트 호스트)
    pub agency_tag: String,
    /// 코퍼스 파일의 섹션 제목
    pub category: Option<String>,
    /// 랭커만 설정하는 관련도 점수
    pub score: f64,
}

impl QaItem {
    /// 질문/답변이 trim 후 비어있으면 `None`
    pub fn new(
        question: &str,
        answer: &str,
        source_id: impl Into<String>,
        agency_tag: impl Into<String>,
    ) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }

        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
            source_id: source_id.into(),
            agency_tag: agency_tag.into(),
            category: None,
            score: 0.0,
        })
    }

    /// 섹션 제목 지정
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.category = Some(category);
        }
        self
    }

    /// 랭킹용 전체 텍스트
    pub fn full_text(&self) -> String {
        format!("Q: {}\nA: {}", self.question, self.answer)
    }
}

// ============================================================================
// Answer Types
// ============================================================================

/// 답변을 만든 계층
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMethod {
    Critical,
    Pattern,
    DeepSearch,
    CorpusSearch,
    Fallback,
}

impl AnswerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMethod::Critical => "critical",
            AnswerMethod::Pattern => "pattern",
            AnswerMethod::DeepSearch => "deep_search",
            AnswerMethod::CorpusSearch => "corpus_search",
            AnswerMethod::Fallback => "fallback",
        }
    }
}

/// 오케스트레이터 계층 하나가 만든 후보 답변 (반환 후 불변)
#[derive(Debug, Clone, Serialize)]
pub struct AnswerCandidate {
    pub text: String,
    pub source: String,
    /// [0, 1] 범위로 보정됨
    pub confidence: f64,
    pub method: AnswerMethod,
}

impl AnswerCandidate {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        confidence: f64,
        method: AnswerMethod,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            text: text.into(),
            source: source.into(),
            confidence,
            method,
        }
    }
}

/// 호출자에게 반환되는 최종 답변
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedAnswer {
    pub body: String,
    /// 순서 보존, 중복 없음
    pub sources: Vec<String>,
}

impl FormattedAnswer {
    pub fn new<I, S>(body: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            body: body.into(),
            sources: ordered_unique(sources),
        }
    }
}

/// 순서를 보존하며 중복과 빈 문자열 제거
pub fn ordered_unique<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.into();
        if !value.trim().is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
