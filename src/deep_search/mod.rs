//! 딥서치 - 질문 유형 프로파일 기반 신뢰도 점수 검색
//!
//! 쿼리가 알려진 질문 유형(키워드 2개 이상 일치)으로 분류되면
//! 각 소스 문서에 세 가지 패스를 적용합니다:
//! 1. 정규식 패턴 매칭 → 주변 ±200자 창에서 Q/A 분리
//! 2. 의미 블록 → 키워드 2개 이상 블록을 줄 스캔으로 채굴
//! 3. 문장 채굴 → 금액/기간/무료 신호가 강한 문장을 근처 질문과 짝지음
//!
//! 모든 후보는 같은 신뢰도 공식으로 점수가 매겨지고 풀링됩니다.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::extractor::page::lines_of;
use crate::extractor::{scan_lines, Page};
use crate::knowledge::question::normalized_key;
use crate::knowledge::{
    clean_text, contains_term, looks_like_question, AnswerCandidate, AnswerMethod, Document,
};
use crate::scraper::{fetch_all, ContentSource};

/// 이 신뢰도 이상이면 "높은 신뢰도" 후보
pub const HIGH_CONFIDENCE: f64 = 0.7;

const HIGH_CONFIDENCE_LIMIT: usize = 3;
const OVERALL_LIMIT: usize = 5;

/// 분류에 필요한 최소 키워드 일치 수
const MIN_PROFILE_MATCHES: usize = 2;

/// 패턴 매칭 주변 창 크기 (문자 수)
const CONTEXT_WINDOW: usize = 200;
const MIN_BLOCK_CHARS: usize = 50;
const MIN_BLOCK_KEYWORDS: usize = 2;
const MIN_SEMANTIC_CONFIDENCE: f64 = 0.3;
const MIN_SENTENCE_CHARS: usize = 20;
const MIN_SENTENCE_SIGNAL: usize = 3;
const MIN_ANSWER_LINE_CHARS: usize = 10;

// ============================================================================
// Profiles
// ============================================================================

/// 질문 유형 프로파일
pub struct Profile {
    pub name: &'static str,
    keywords: &'static [&'static str],
    patterns: &'static [&'static str],
    /// (답변 정규식, 가산점)
    bonuses: &'static [(&'static str, f64)],
}

const PROFILES: &[Profile] = &[
    Profile {
        name: "ic_chip_cost",
        keywords: &["cip", "chip", "ic", "kad pengenalan", "rosak", "bayaran", "kos", "harga"],
        patterns: &[
            r"bayaran.*cip.*rosak",
            r"kos.*ganti.*ic",
            r"rm\s*\d+.*cip",
            r"percuma.*kerosakan",
            r"satu tahun.*percuma",
        ],
        bonuses: &[
            (r"rm\s*\d+", 0.3),
            (r"percuma|free", 0.2),
            (r"satu tahun|1 tahun", 0.2),
            (r"kerosakan|rosak", 0.1),
        ],
    },
    Profile {
        name: "passport_requirements",
        keywords: &["passport", "pasport", "syarat", "keperluan", "dokumen"],
        patterns: &[r"syarat.*pasport", r"dokumen.*diperlukan", r"keperluan.*passport"],
        bonuses: &[],
    },
];

/// 정규식이 컴파일된 프로파일
pub struct CompiledProfile {
    pub profile: &'static Profile,
    patterns: Vec<Regex>,
    bonuses: Vec<(Regex, f64)>,
}

impl CompiledProfile {
    fn compile(profile: &'static Profile) -> Self {
        let patterns = profile
            .patterns
            .iter()
            .filter_map(|p| compile_logged(&format!("(?i){}", p)))
            .collect();
        let bonuses = profile
            .bonuses
            .iter()
            .filter_map(|(p, w)| compile_logged(p).map(|re| (re, *w)))
            .collect();

        Self {
            profile,
            patterns,
            bonuses,
        }
    }

    pub fn name(&self) -> &'static str {
        self.profile.name
    }

    /// 텍스트(소문자)에 나타난 프로파일 키워드 수
    pub fn keyword_hits(&self, lower: &str) -> usize {
        self.profile
            .keywords
            .iter()
            .filter(|k| contains_term(lower, k))
            .count()
    }
}

fn compile_logged(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid profile pattern {:?}: {}", pattern, e);
            None
        }
    }
}

static COMPILED: LazyLock<Vec<CompiledProfile>> =
    LazyLock::new(|| PROFILES.iter().map(CompiledProfile::compile).collect());

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));
static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rm\s*\d+").expect("valid currency regex"));
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(satu|1)\s*(tahun|year)").expect("valid period regex"));
static FREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"percuma|free|tiada bayaran").expect("valid free regex"));

/// 쿼리를 질문 유형으로 분류 (가장 많이 일치한 프로파일, 2개 이상일 때만)
pub fn classify(query: &str) -> Option<&'static CompiledProfile> {
    let lower = query.to_lowercase();
    let compiled: &'static Vec<CompiledProfile> = &COMPILED;

    let mut best: Option<(&'static CompiledProfile, usize)> = None;
    for profile in compiled.iter() {
        let hits = profile.keyword_hits(&lower);
        if hits >= MIN_PROFILE_MATCHES && best.map(|(_, b)| hits > b).unwrap_or(true) {
            best = Some((profile, hits));
        }
    }

    best.map(|(profile, _)| profile)
}

// ============================================================================
// Candidates
// ============================================================================

/// 후보를 만든 패스
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Pattern,
    Semantic,
    Sentence,
}

/// 딥서치 후보
#[derive(Debug, Clone, Serialize)]
pub struct DeepCandidate {
    pub question: String,
    pub answer: String,
    pub source_id: String,
    pub website: String,
    pub confidence: f64,
    pub pass: Pass,
}

impl DeepCandidate {
    pub fn to_candidate(&self) -> AnswerCandidate {
        AnswerCandidate::new(
            self.answer.clone(),
            self.website.clone(),
            self.confidence,
            AnswerMethod::DeepSearch,
        )
    }
}

/// Q/A 쌍의 신뢰도
///
/// 0.2 기본 + min(0.4, 0.1 × 키워드 수) + 프로파일 가산점
/// + 0.1 (질문 형태) ± 0.1 (답변 길이 50–500 보상, 500 초과 감점), [0, 1] 보정
pub fn score_confidence(profile: &CompiledProfile, question: &str, answer: &str) -> f64 {
    let question_lower = question.to_lowercase();
    let answer_lower = answer.to_lowercase();

    let keyword_matches = profile
        .profile
        .keywords
        .iter()
        .filter(|k| contains_term(&answer_lower, k) || contains_term(&question_lower, k))
        .count();

    let mut confidence = 0.2 + (0.1 * keyword_matches as f64).min(0.4);

    for (re, weight) in &profile.bonuses {
        if re.is_match(&answer_lower) {
            confidence += weight;
        }
    }

    if looks_like_question(question) {
        confidence += 0.1;
    }

    let length = answer.chars().count();
    if (50..=500).contains(&length) {
        confidence += 0.1;
    } else if length > 500 {
        confidence -= 0.1;
    }

    confidence.clamp(0.0, 1.0)
}

// ============================================================================
// Passes
// ============================================================================

/// 문서 하나에 세 패스 적용
pub fn search_document(profile: &CompiledProfile, doc: &Document) -> Vec<DeepCandidate> {
    let page = Page::parse(doc);
    let full_text = page.full_text();

    let mut pairs: Vec<(String, String, Pass)> = Vec::new();
    pairs.extend(pattern_pass(profile, &full_text).into_iter().map(|(q, a)| (q, a, Pass::Pattern)));
    pairs.extend(
        semantic_pass(profile, &page.content_blocks())
            .into_iter()
            .map(|(q, a)| (q, a, Pass::Semantic)),
    );
    pairs.extend(sentence_pass(profile, &full_text).into_iter().map(|(q, a)| (q, a, Pass::Sentence)));

    let candidates: Vec<DeepCandidate> = pairs
        .into_iter()
        .map(|(question, answer, pass)| {
            let confidence = score_confidence(profile, &question, &answer);
            DeepCandidate {
                question,
                answer,
                source_id: page.source_id.clone(),
                website: page.website.clone(),
                confidence,
                pass,
            }
        })
        .collect();

    tracing::info!(
        "Deep search [{}] found {} potential answers from {}",
        profile.name(),
        candidates.len(),
        page.website
    );
    candidates
}

/// 1. 패턴 매칭 주변 창에서 Q/A 분리
fn pattern_pass(profile: &CompiledProfile, full_text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for re in &profile.patterns {
        for m in re.find_iter(full_text) {
            let (start, end) = char_window(full_text, m.start(), m.end(), CONTEXT_WINDOW);
            let context = full_text[start..end].trim();

            if let Some(pair) = split_context(context, m.as_str()) {
                pairs.push(pair);
            }
        }
    }

    pairs
}

/// 매칭 범위를 앞뒤로 `chars`자씩 넓힌 바이트 범위
fn char_window(text: &str, start: usize, end: usize, chars: usize) -> (usize, usize) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(chars)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| end + i);
    (from, to)
}

/// 창 안에서 매칭 줄 기준으로 질문(앞 3줄 이내)과 답변(주변 줄) 선택
fn split_context(context: &str, matched: &str) -> Option<(String, String)> {
    let lines: Vec<String> = lines_of(context).into_iter().map(|l| clean_text(&l)).collect();
    let matched = matched.to_lowercase();
    let at = lines.iter().position(|l| l.to_lowercase().contains(&matched))?;

    let question = lines[at.saturating_sub(3)..=at]
        .iter()
        .find(|l| looks_like_question(l))?
        .clone();

    let answer_end = (at + 3).min(lines.len());
    let answer: Vec<&str> = lines[at.saturating_sub(1)..answer_end]
        .iter()
        .filter(|l| l.chars().count() > MIN_ANSWER_LINE_CHARS)
        .map(|l| l.as_str())
        .collect();
    if answer.is_empty() {
        return None;
    }

    Some((question, answer.join(" ")))
}

/// 2. 키워드가 모인 블록을 줄 스캔으로 채굴 (신뢰도 0.3 초과만)
fn semantic_pass(profile: &CompiledProfile, blocks: &[String]) -> Vec<(String, String)> {
    blocks
        .iter()
        .filter(|b| b.chars().count() >= MIN_BLOCK_CHARS)
        .filter(|b| profile.keyword_hits(&b.to_lowercase()) >= MIN_BLOCK_KEYWORDS)
        .flat_map(|b| {
            let lines: Vec<String> = lines_of(b).into_iter().map(|l| clean_text(&l)).collect();
            scan_lines(&lines)
        })
        .filter(|(q, a)| score_confidence(profile, q, a) > MIN_SEMANTIC_CONFIDENCE)
        .collect()
}

/// 3. 신호가 강한 문장을 가까운 질문 문장과 짝지음
fn sentence_pass(profile: &CompiledProfile, full_text: &str) -> Vec<(String, String)> {
    let sentences: Vec<String> = SENTENCE_SPLIT.split(full_text).map(clean_text).collect();
    let mut pairs = Vec::new();

    for (i, sentence) in sentences.iter().enumerate() {
        if sentence.chars().count() < MIN_SENTENCE_CHARS {
            continue;
        }

        let lower = sentence.to_lowercase();
        let mut signal = profile.keyword_hits(&lower);
        if CURRENCY.is_match(&lower) {
            signal += 2;
        }
        if PERIOD.is_match(&lower) {
            signal += 1;
        }
        if FREE.is_match(&lower) {
            signal += 2;
        }
        if signal < MIN_SENTENCE_SIGNAL {
            continue;
        }

        if let Some(question) = question_near(&sentences, i) {
            pairs.push((question.to_string(), sentence.clone()));
        }
    }

    pairs
}

/// 가장 가까운 앞 문장(최대 5개 전) 우선, 없으면 바로 다음 문장
fn question_near(sentences: &[String], index: usize) -> Option<&str> {
    let before = (index.saturating_sub(5)..index).rev();
    let after = index + 1..(index + 2).min(sentences.len());

    before
        .chain(after)
        .map(|j| sentences[j].as_str())
        .find(|s| looks_like_question(s))
}

// ============================================================================
// Selection
// ============================================================================

/// 풀링된 후보 정렬 및 선택
///
/// 0.7 이상 후보가 있으면 그 중 상위 3개, 없으면 전체 상위 5개.
pub fn select(mut pooled: Vec<DeepCandidate>) -> Vec<DeepCandidate> {
    // 같은 소스의 같은 Q/A는 한 번만
    let mut seen = std::collections::HashSet::new();
    pooled.retain(|c| {
        seen.insert((
            c.source_id.clone(),
            normalized_key(&c.question),
            normalized_key(&c.answer),
        ))
    });

    pooled.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let high = pooled
        .iter()
        .filter(|c| c.confidence >= HIGH_CONFIDENCE)
        .count();
    if high > 0 {
        pooled.truncate(high.min(HIGH_CONFIDENCE_LIMIT));
    } else {
        pooled.truncate(OVERALL_LIMIT);
    }

    pooled
}

// ============================================================================
// DeepSearcher
// ============================================================================

/// 여러 소스에 걸친 딥서치
pub struct DeepSearcher {
    source: Arc<dyn ContentSource>,
    source_ids: Vec<String>,
    workers: usize,
}

impl DeepSearcher {
    pub fn new(source: Arc<dyn ContentSource>, source_ids: Vec<String>, workers: usize) -> Self {
        Self {
            source,
            source_ids,
            workers,
        }
    }

    /// 쿼리를 분류하고 모든 소스를 검색
    ///
    /// 분류되지 않는 쿼리는 아무것도 가져오지 않고 빈 결과를 반환합니다.
    pub async fn search(&self, query: &str) -> Vec<DeepCandidate> {
        let Some(profile) = classify(query) else {
            tracing::debug!("Deep search skipped: no profile for {:?}", query);
            return Vec::new();
        };
        tracing::info!("Deep search profile: {}", profile.name());

        let docs = fetch_all(self.source.as_ref(), &self.source_ids, self.workers).await;
        let pooled: Vec<DeepCandidate> = docs
            .into_iter()
            .filter_map(Result::ok)
            .flat_map(|doc| search_document(profile, &doc))
            .collect();

        select(pooled)
    }
}

// ============================================================================
// Tests
// ============================================================================
