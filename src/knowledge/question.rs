//! 질문 판별 및 텍스트 정리
//!
//! 모든 추출 전략과 딥서치가 같은 판별 함수를 공유합니다.

use std::sync::LazyLock;

use regex::Regex;

/// 질문 지시어 (말레이어 + 영어)
const QUESTION_WORDS: &[&str] = &[
    "adakah", "bagaimana", "apakah", "mengapa", "kenapa", "bila", "kapan", "siapa", "berapa",
    "what", "how", "when", "where", "why", "who", "which", "can", "could", "should", "would",
];

/// 여러 단어로 된 지시어
const QUESTION_PHRASES: &[&str] = &["di mana", "macam mana"];

/// 질문 시작어
const LEADING_WORDS: &[&str] = &[
    "adakah", "bagaimana", "apakah", "what", "how", "when", "where", "why", "who",
];

/// 이 길이 이하이면 질문 후보로 보지 않음
const MIN_QUESTION_CHARS: usize = 10;

/// 지시어만 있고 `?`도 시작어도 없을 때 허용하는 최대 길이
const MAX_LOOSE_QUESTION_CHARS: usize = 200;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•*▪]\s*").expect("valid bullet regex"));
static PIPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*").expect("valid pipe regex"));

/// 텍스트가 질문처럼 보이는지 판별
///
/// 지시어가 하나 이상 있고, (`?`로 끝나거나 / 질문 시작어로 시작하거나 /
/// 200자 미만)이면 질문으로 봅니다.
pub fn looks_like_question(text: &str) -> bool {
    let trimmed = text.trim();
    let char_count = trimmed.chars().count();
    if char_count < MIN_QUESTION_CHARS {
        return false;
    }

    let lower = trimmed.to_lowercase();
    let words = words(&lower);

    let has_indicator = lower.contains('?')
        || words.iter().any(|w| is_question_word(w))
        || QUESTION_PHRASES.iter().any(|p| contains_term(&lower, p));
    if !has_indicator {
        return false;
    }

    let ends_with_question = trimmed.ends_with('?');
    let starts_with_question_word = words
        .first()
        .map(|w| LEADING_WORDS.contains(w))
        .unwrap_or(false);

    ends_with_question || starts_with_question_word || char_count < MAX_LOOSE_QUESTION_CHARS
}

/// 질문 지시어 여부 (말레이어 `-kah` 접미사 허용: berapakah, bilakah)
fn is_question_word(word: &str) -> bool {
    QUESTION_WORDS.contains(&word)
        || word
            .strip_suffix("kah")
            .map(|stem| QUESTION_WORDS.contains(&stem))
            .unwrap_or(false)
}

/// 소문자 텍스트를 영숫자 단어로 분할
pub fn words(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// 단어 시작 경계에서 `term`이 나타나는지 확인
///
/// `"rm"`은 `"rm10"`에는 매칭되지만 `"permohonan"`에는 매칭되지 않습니다.
/// 두 인자 모두 소문자여야 합니다.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    haystack.match_indices(term).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true)
    })
}

/// 텍스트 정리
///
/// 연속 공백 축약, 앞쪽 불릿 제거, 파이프 구분자 제거
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    let collapsed = collapsed.trim();
    let unbulleted = BULLET_RE.replace(collapsed, "");
    PIPE_RE.replace_all(&unbulleted, " ").trim().to_string()
}

/// 정규화된 질문 키 (중복 제거용)
pub fn normalized_key(text: &str) -> String {
    words(&text.to_lowercase()).join(" ")
}

/// 문자 수 기준으로 앞부분 자르기
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_mark_qualifies() {
        assert!(looks_like_question("Berapakah kos penggantian kad?"));
        assert!(looks_like_question("What documents are required?"));
    }

    #[test]
    fn test_leading_word_qualifies_long_text() {
        let long = format!("Bagaimana {}", "saya memohon lesen ".repeat(20));
        assert!(long.chars().count() > 200);
        assert!(looks_like_question(&long));
    }

    #[test]
    fn test_short_text_with_indicator_qualifies() {
        // 200자 미만 + 지시어 = 질문으로 간주
        assert!(looks_like_question("Siapa boleh memohon kad ini"));
    }

    #[test]
    fn test_non_questions() {
        assert!(!looks_like_question("Short?"));
        assert!(!looks_like_question("Pejabat dibuka setiap hari bekerja."));
        // 지시어가 있지만 길고 ?로 끝나지 않으며 시작어도 아님
        let long = format!("Pemohon {} siapa", "perlu hadir sendiri ".repeat(15));
        assert!(!looks_like_question(&long));
    }

    #[test]
    fn test_indicator_needs_word_boundary() {
        // "bila" 가 "bilangan" 안에 있어도 지시어로 보지 않음
        assert!(!looks_like_question("Bilangan pemohon meningkat."));
        assert!(looks_like_question("Di mana saya boleh mohon"));
    }

    #[test]
    fn test_kah_suffix_indicator() {
        assert!(looks_like_question("Bilakah kaunter JPN dibuka"));
        assert!(looks_like_question("Berapakah yuran permohonan baharu"));
        assert!(!looks_like_question("Kuih lapis kek dijual di kedai."));
    }

    #[test]
    fn test_contains_term() {
        assert!(contains_term("bayaran rm10 dikenakan", "rm"));
        assert!(!contains_term("permohonan baru", "rm"));
        assert!(contains_term("cip ic rosak?", "ic"));
        assert!(contains_term("kad pengenalan", "kad pengenalan"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  -  Item   satu\n\tdua "), "Item satu dua");
        assert_eq!(clean_text("• Yuran | RM 10"), "Yuran RM 10");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_normalized_key() {
        assert_eq!(normalized_key("  What is X? "), "what is x");
        assert_eq!(normalized_key("WHAT  is x"), "what is x");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Bayaran • RM10", 9), "Bayaran •");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
    }
}
