//! 답변 합성기 - 근거 레코드로 프롬프트를 만들어 생성 모델에 질의
//!
//! Chat 프로토콜을 먼저 시도하고, 실패하면 Completion 프로토콜로 한 번 더
//! 시도합니다. 둘 다 실패하면 최상위 후보 본문을 그대로 반환합니다.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::critical::topic_contact;
use super::tiers::{Grounding, TierOutcome, MAX_GROUNDING};
use crate::knowledge::{ordered_unique, FormattedAnswer};
use crate::llm::{CompletionOptions, GenerativeModelClient, WireProtocol};

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));
static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[^`]*```").expect("valid code block regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("valid heading regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").expect("valid bullet regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid blank-run regex"));

/// 근거 레코드 + 지시문으로 프롬프트 구성 (근거는 최대 5개)
pub fn build_prompt(query: &str, grounding: &[Grounding]) -> String {
    let mut context = String::new();
    for (i, g) in grounding.iter().take(MAX_GROUNDING).enumerate() {
        context.push_str(&format!(
            "\n--- FAQ {} ({}, relevance {:.1}) ---\nQ: {}\nA: {}\n",
            i + 1,
            g.source,
            g.score,
            g.question,
            g.answer
        ));
    }

    format!(
        "You are an assistant answering questions from Malaysian government FAQ content.\n\
         \n\
         User Question: {query}\n\
         \n\
         Available FAQ Content:\n\
         {context}\n\
         INSTRUCTIONS:\n\
         1. Examine ALL FAQ content above for any information related to the question.\n\
         2. Look for related procedures, costs and eligibility requirements even if the keywords do not match exactly.\n\
         3. Use the EXACT figures, fees, dates and names from the FAQ content. Do not change details.\n\
         4. Answer in the same language as the user's question (Malay or English).\n\
         5. Only say no information was found after checking ALL FAQ content.\n\
         \n\
         FORMAT:\n\
         Plain text only. No markdown, no ** bold, no - or * bullets, no headings.\n\
         Use numbered lists (1., 2., 3.) and paragraph breaks where needed.\n\
         \n\
         Answer:"
    )
}

/// 모델이 남긴 마크다운 제거
pub fn strip_markup(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "• ");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// `Sumber:` 출처 블록
pub fn sources_block(sources: &[String]) -> String {
    let mut block = String::from("\n\nSumber:");
    for source in sources {
        block.push_str("\n• ");
        block.push_str(source);
    }
    block
}

/// 답변 합성기
pub struct Synthesizer {
    client: Option<Arc<dyn GenerativeModelClient>>,
    options: CompletionOptions,
}

impl Synthesizer {
    pub fn new(client: Option<Arc<dyn GenerativeModelClient>>) -> Self {
        Self {
            client,
            options: CompletionOptions::default(),
        }
    }

    /// 모델 없이 후보 본문만 사용
    pub fn passthrough() -> Self {
        Self::new(None)
    }

    pub fn has_model(&self) -> bool {
        self.client.is_some()
    }

    /// 계층 결과를 최종 답변으로
    pub async fn synthesize(&self, query: &str, outcome: &TierOutcome) -> FormattedAnswer {
        let sources = ordered_unique(
            outcome
                .grounding
                .iter()
                .map(|g| g.source.clone())
                .chain(std::iter::once(outcome.candidate.source.clone())),
        );

        if let Some(client) = &self.client {
            let prompt = build_prompt(query, &outcome.grounding);
            if let Some(text) = self.ask_model(client.as_ref(), &prompt).await {
                return FormattedAnswer::new(format!("{}{}", text, sources_block(&sources)), sources);
            }
        }

        Self::direct(query, outcome)
    }

    /// 모델 없이 최상위 후보와 그 출처로 응답
    ///
    /// 근거 레코드가 하나도 없으면 주제별 연락처 안내를 우선합니다.
    pub fn direct(query: &str, outcome: &TierOutcome) -> FormattedAnswer {
        if outcome.grounding.is_empty() {
            if let Some((body, source)) = topic_contact(query) {
                let sources = vec![source.to_string()];
                return FormattedAnswer::new(format!("{}{}", body, sources_block(&sources)), sources);
            }
        }

        let candidate = &outcome.candidate;
        let body = match outcome.grounding.first() {
            Some(g) if g.answer == candidate.text => format!("{}\n\n{}", g.question, g.answer),
            _ => candidate.text.clone(),
        };
        let sources = vec![candidate.source.clone()];
        FormattedAnswer::new(format!("{}{}", body, sources_block(&sources)), sources)
    }

    /// Chat → Completion 순으로 시도, 빈 응답도 실패로 취급
    async fn ask_model(&self, client: &dyn GenerativeModelClient, prompt: &str) -> Option<String> {
        let attempts = [
            self.options.clone(),
            self.options.clone().with_protocol(WireProtocol::Completion),
        ];

        for options in attempts {
            match client.complete(prompt, &options).await {
                Ok(text) => {
                    let cleaned = strip_markup(&text);
                    if !cleaned.is_empty() {
                        return Some(cleaned);
                    }
                    tracing::warn!("Model {} returned empty text ({:?})", client.name(), options.protocol);
                }
                Err(e) => {
                    tracing::warn!("Model {} failed ({:?}): {}", client.name(), options.protocol, e);
                }
            }
        }

        None
    }
}

// ============================================================================
// Tests
// ============================================================================
