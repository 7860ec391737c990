//! 관련도 랭커 - 쿼리 대비 Q&A 레코드 점수 계산
//!
//! 점수 구성:
//! - 용어 겹침 (질문 +5, 답변 +3, 부분 일치 +2/+1)
//! - 쿼리 전체 문구 포함 (질문 +5, 답변 +2)
//! - 주제 동시 출현 (+8)
//! - 의도별 문맥 보너스 (+10)
//! - 고가치 주제 증폭 (+15)
//!
//! 원본 레코드는 건드리지 않고 점수가 매겨진 복사본을 반환합니다.

use super::corpus::Corpus;
use super::question::contains_term;
use super::QaItem;

/// 기본 반환 개수
pub const DEFAULT_RANK_LIMIT: usize = 10;

const QUESTION_TERM_WEIGHT: f64 = 5.0;
const ANSWER_TERM_WEIGHT: f64 = 3.0;
const QUESTION_PARTIAL_WEIGHT: f64 = 2.0;
const ANSWER_PARTIAL_WEIGHT: f64 = 1.0;
const QUESTION_PHRASE_WEIGHT: f64 = 5.0;
const ANSWER_PHRASE_WEIGHT: f64 = 2.0;
const TOPIC_WEIGHT: f64 = 8.0;
const CONTEXT_WEIGHT: f64 = 10.0;
const AMPLIFIER_WEIGHT: f64 = 15.0;

/// 주제 → 키워드
const TOPICS: &[(&str, &[&str])] = &[
    ("ic", &["ic", "kad pengenalan", "mykad", "cip", "chip", "pengenalan"]),
    ("apmm", &["apmm", "maritim", "join", "menyertai", "permohonan"]),
    (
        "pdrm",
        &["polis", "pdrm", "pengambilan", "recruitment", "konstabel", "sarjan", "inspektor"],
    ),
    ("rela", &["rela", "sukarelawan", "keanggotaan", "latihan"]),
    ("jpn", &["jpn", "kelahiran", "sijil lahir", "pendaftaran negara"]),
    ("ros", &["pertubuhan", "ros", "alamat berdaftar", "organisasi", "persatuan"]),
    ("passport", &["pasport", "passport", "imigresen", "travel"]),
    ("lesen", &["lesen", "memandu", "senjata", "permit", "kelulusan"]),
    (
        "alquran",
        &[
            "alquran", "al-quran", "quran", "pencetakan", "penerbitan", "teks", "lpppq",
            "sistem upq", "borang a",
        ],
    ),
    ("filem", &["filem", "penapisan", "lpf", "tayangan", "pawagam"]),
    ("senjata", &["senjata api", "pistol", "senapang", "firearm"]),
    ("piroteknik", &["piroteknik", "bunga api", "mercun", "letupan"]),
    (
        "procedure",
        &["mohon", "permohonan", "apply", "prosedur", "cara", "bagaimana", "macam mana", "how"],
    ),
    (
        "requirements",
        &["syarat", "kelayakan", "requirement", "criteria", "eligibility"],
    ),
    ("cost", &["bayar", "bayaran", "kos", "yuran", "fee", "cost", "charge", "rm"]),
];

/// 의도 용어(쿼리)와 응답 용어(답변)가 함께 나타나면 보너스
struct ContextRule {
    query_terms: &'static [&'static str],
    answer_terms: &'static [&'static str],
}

const CONTEXT_RULES: &[ContextRule] = &[
    // 절차
    ContextRule {
        query_terms: &["mohon", "apply", "permohonan", "cara", "bagaimana", "macam mana", "how"],
        answer_terms: &["permohonan", "borang", "sistem", "prosedur", "langkah"],
    },
    // 비용
    ContextRule {
        query_terms: &["bayar", "kos", "yuran", "fee", "cost"],
        answer_terms: &["rm", "bayaran", "yuran", "percuma", "free"],
    },
    // 자격
    ContextRule {
        query_terms: &["syarat", "requirement", "kelayakan"],
        answer_terms: &["syarat", "kelayakan", "criteria", "umur", "warganegara"],
    },
];

/// 고가치 주제 증폭 (쿼리와 레코드 전체 텍스트 모두 매칭 시)
struct Amplifier {
    query_terms: &'static [&'static str],
    record_terms: &'static [&'static str],
}

const AMPLIFIERS: &[Amplifier] = &[
    Amplifier {
        query_terms: &["quran", "alquran", "al-quran"],
        record_terms: &["quran", "al-quran", "lpppq", "pencetakan", "penerbitan", "sistem upq"],
    },
    Amplifier {
        query_terms: &["cip", "chip"],
        record_terms: &["cip", "chip", "mykad"],
    },
];

fn any_term(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(text, t))
}

/// 쿼리 토큰 (앞뒤 구두점 제거)
fn query_tokens(query_lower: &str) -> Vec<&str> {
    query_lower
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| t.chars().count() > 2)
        .collect()
}

/// 레코드 하나의 관련도 점수
pub fn score_item(item: &QaItem, query: &str) -> f64 {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return 0.0;
    }

    let question = item.question.to_lowercase();
    let answer = item.answer.to_lowercase();
    let full_text = item.full_text().to_lowercase();
    let mut score = 0.0;

    // 1. 용어 겹침
    for token in query_tokens(&query_lower) {
        if question.contains(token) {
            score += QUESTION_TERM_WEIGHT;
        }
        if answer.contains(token) {
            score += ANSWER_TERM_WEIGHT;
        }

        if token.chars().count() > 3 {
            let question_hits = question.split_whitespace().filter(|w| w.contains(token)).count();
            let answer_hits = answer.split_whitespace().filter(|w| w.contains(token)).count();
            score += question_hits as f64 * QUESTION_PARTIAL_WEIGHT;
            score += answer_hits as f64 * ANSWER_PARTIAL_WEIGHT;
        }
    }

    // 2. 전체 문구 포함
    if question.contains(&query_lower) {
        score += QUESTION_PHRASE_WEIGHT;
    }
    if answer.contains(&query_lower) {
        score += ANSWER_PHRASE_WEIGHT;
    }

    // 3. 주제 동시 출현
    for (_, keywords) in TOPICS {
        if any_term(&query_lower, keywords) && any_term(&full_text, keywords) {
            score += TOPIC_WEIGHT;
        }
    }

    // 4. 의도별 문맥 보너스
    for rule in CONTEXT_RULES {
        if any_term(&query_lower, rule.query_terms) && any_term(&answer, rule.answer_terms) {
            score += CONTEXT_WEIGHT;
        }
    }

    // 5. 고가치 주제 증폭
    for amp in AMPLIFIERS {
        if any_term(&query_lower, amp.query_terms) && any_term(&full_text, amp.record_terms) {
            score += AMPLIFIER_WEIGHT;
        }
    }

    score
}

/// 레코드 목록 랭킹
///
/// 점수 내림차순, 동점은 입력 순서 유지. 점수 0 이하는 제외.
pub fn rank_items<'a, I>(items: I, query: &str, limit: usize) -> Vec<QaItem>
where
    I: IntoIterator<Item = &'a QaItem>,
{
    let mut scored: Vec<QaItem> = items
        .into_iter()
        .filter_map(|item| {
            let score = score_item(item, query);
            if score > 0.0 {
                let mut copy = item.clone();
                copy.score = score;
                Some(copy)
            } else {
                None
            }
        })
        .collect();

    // sort_by는 안정 정렬
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);

    tracing::debug!("Ranked {} relevant items for {:?}", scored.len(), query);
    scored
}

/// 코퍼스 랭킹
pub fn rank(corpus: &Corpus, query: &str, limit: usize) -> Vec<QaItem> {
    rank_items(corpus.iter(), query, limit)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(q: &str, a: &str) -> QaItem {
        QaItem::new(q, a, "faq.txt", "JPN").expect("valid item")
    }

    #[test]
    fn test_term_overlap() {
        let record = item("Bagaimana memohon lesen?", "Isi borang di pejabat.");
        // "lesen": 질문 +5, 부분 일치 +2 / 주제(lesen) +8
        // "memohon" 은 쿼리에 없음
        let score = score_item(&record, "lesen");
        assert_eq!(score, 5.0 + 2.0 + 5.0 + 8.0);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let record = item("Apakah MyKad?", "Kad pengenalan.");
        assert_eq!(score_item(&record, "   "), 0.0);
    }

    #[test]
    fn test_phrase_in_answer_never_decreases_score() {
        let query = "tarikh luput dokumen";
        let without = item("Soalan umum tentang urusan?", "Sila hubungi pejabat berhampiran.");
        let with = item(
            "Soalan umum tentang urusan?",
            "Sila hubungi pejabat berhampiran. Semak tarikh luput dokumen anda.",
        );
        assert!(score_item(&with, query) > score_item(&without, query));
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let a = item("Apakah syarat lesen A?", "Jawapan sama.");
        let b = item("Apakah syarat lesen B?", "Jawapan sama.");
        let corpus = Corpus::from_items("faq.txt", vec![a, b]);

        let ranked = rank(&corpus, "lesen", 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].question, "Apakah syarat lesen A?");
        assert_eq!(ranked[1].question, "Apakah syarat lesen B?");
    }

    #[test]
    fn test_rank_excludes_zero_and_respects_limit() {
        let corpus = Corpus::from_items(
            "faq.txt",
            vec![
                item("Bagaimana memohon pasport?", "Datang ke pejabat imigresen."),
                item("Waktu operasi pejabat?", "Isnin hingga Jumaat."),
                item("Syarat pasport kanak-kanak?", "Sijil lahir diperlukan."),
            ],
        );

        let ranked = rank(&corpus, "pasport", 10);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|i| i.score > 0.0));

        let limited = rank(&corpus, "pasport", 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_rank_does_not_mutate_corpus() {
        let corpus = Corpus::from_items("faq.txt", vec![item("Apakah MyKad?", "Kad pengenalan.")]);
        let ranked = rank(&corpus, "mykad", 10);
        assert!(ranked[0].score > 0.0);
        assert_eq!(corpus.iter().next().map(|i| i.score), Some(0.0));
        assert_eq!(ranked[0].question, "Apakah MyKad?");
    }

    #[test]
    fn test_cost_context_bonus() {
        let query = "berapa kos ganti";
        let cost = item("Penggantian kad?", "Bayaran RM10 dikenakan.");
        let plain = item("Penggantian kad?", "Sila datang ke pejabat.");
        let diff = score_item(&cost, query) - score_item(&plain, query);
        // 문맥 보너스(+10) + 비용 주제(+8)
        assert_eq!(diff, 18.0);
    }

    #[test]
    fn test_quran_amplifier() {
        let record = item(
            "Bagaimana mendapatkan kelulusan pencetakan?",
            "Mohon melalui sistem UPQ LPPPQ.",
        );
        let with_quran = score_item(&record, "al-quran");
        let other = score_item(&record, "zzz-unrelated");
        assert!(with_quran >= AMPLIFIER_WEIGHT + TOPIC_WEIGHT);
        assert_eq!(other, 0.0);
    }
}
