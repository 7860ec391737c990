//! 고정 답변 테이블 - 핵심 답변, 패턴 매핑, 연락처 폴백
//!
//! 답변 본문은 모두 평문입니다 (마크다운 없음).

use std::sync::LazyLock;

use regex::Regex;

use crate::knowledge::{contains_term, AnswerCandidate, AnswerMethod};

/// 핵심 답변 트리거에 필요한 최소 키워드 수
const MIN_CRITICAL_MATCHES: usize = 3;

pub const CRITICAL_CONFIDENCE: f64 = 1.0;
pub const PATTERN_CONFIDENCE: f64 = 0.9;
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// 일반 폴백 답변의 출처 태그
pub const GENERAL_FALLBACK_SOURCE: &str = "general_fallback";

/// 내부 전체 실패 시 출처 태그
pub const FALLBACK_SYSTEM_SOURCE: &str = "fallback-system";

/// 일반 폴백 본문 (말레이어/영어 연락처 안내)
pub const GENERAL_FALLBACK_BODY: &str = "\
Maaf, maklumat spesifik untuk soalan anda tidak tersedia dalam FAQ yang disediakan.
Sorry, specific information for your question is not available in the provided FAQ.

Untuk maklumat terkini dan tepat, sila hubungi pihak berkuasa berkaitan:

Jabatan Pendaftaran Negara (JPN)
Laman web: https://www.jpn.gov.my
Talian: 1-300-88-4444

Jabatan Imigresen Malaysia
Laman web: https://www.imi.gov.my
Talian: 03-8880 1000

Polis Diraja Malaysia (PDRM)
Laman web: https://www.rmp.gov.my
Talian kecemasan: 999";

/// 손으로 관리하는 핵심 답변
#[derive(Debug)]
pub struct CriticalEntry {
    pub name: &'static str,
    keywords: &'static [&'static str],
    pub answer: &'static str,
    pub source: &'static str,
}

impl CriticalEntry {
    /// 쿼리(소문자)에 나타난 키워드 수
    pub fn keyword_hits(&self, query_lower: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| contains_term(query_lower, k))
            .count()
    }

    fn candidate(&self, confidence: f64, method: AnswerMethod) -> AnswerCandidate {
        AnswerCandidate::new(self.answer, self.source, confidence, method)
    }
}

pub const CRITICAL_ENTRIES: &[CriticalEntry] = &[
    CriticalEntry {
        name: "ic_chip_cost",
        keywords: &[
            "cip", "chip", "ic", "kad pengenalan", "mykad", "rosak", "bayar", "kos",
            "replacement", "replace", "cost", "fee", "damaged", "damage", "broken", "repair",
        ],
        answer: "\
Bayaran Penggantian Cip MyKad yang Rosak

PERCUMA (RM 0.00):
1. Jika kerosakan berlaku dalam tempoh 1 tahun dari tarikh penyerahan kad.
2. Kerosakan bukan disebabkan oleh kesengajaan atau salah guna.

RM 10.00:
1. Jika kerosakan berlaku selepas 1 tahun dari tarikh penyerahan kad.

Prosedur:
1. Pergi ke pejabat Jabatan Pendaftaran Negara (JPN) terdekat.
2. Bawa MyKad yang rosak dan dokumen sokongan.
3. Isi borang permohonan penggantian.
4. Bayar yuran RM 10.00 jika berkenaan.

Hubungi JPN: https://www.jpn.gov.my, talian 1-300-88-4444.",
        source: "www.jpn.gov.my",
    },
    CriticalEntry {
        name: "passport_requirements",
        keywords: &["passport", "pasport", "syarat", "keperluan", "dokumen"],
        answer: "\
Syarat Permohonan Pasport Malaysia

Dokumen diperlukan:
1. Kad Pengenalan (MyKad) asal dan salinan.
2. Sijil kelahiran asal dan salinan.
3. Borang permohonan pasport (IM.12).
4. Dua keping gambar berukuran 2 x 2 inci.

Bayaran:
1. Pasport 32 halaman: RM 200.
2. Pasport 64 halaman: RM 300.

Tempat permohonan: pejabat Imigresen Malaysia, pejabat JPN terpilih, UTC dan kiosk terpilih.",
        source: "www.imi.gov.my",
    },
];

/// 정규식 → 핵심 답변 이름
const PATTERNS: &[(&str, &str)] = &[
    (
        r"(berapa|kos|bayar|harga|cost|fee|much).*(cip|chip|ic).*(rosak|damage|broken|replace)",
        "ic_chip_cost",
    ),
    (
        r"(ic|chip|cip).*(replacement|replace|rosak|damage|broken).*(cost|fee|bayar|kos)",
        "ic_chip_cost",
    ),
    (r"(syarat|keperluan|dokumen).*(passport|pasport)", "passport_requirements"),
    (r"(bagaimana|cara).*(mohon|apply).*(passport|pasport)", "passport_requirements"),
];

static COMPILED_PATTERNS: LazyLock<Vec<(Regex, &'static CriticalEntry)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|(pattern, name)| {
            let entry = entry(name)?;
            match Regex::new(&format!("(?i){}", pattern)) {
                Ok(re) => Some((re, entry)),
                Err(e) => {
                    tracing::error!("Invalid answer pattern {:?}: {}", pattern, e);
                    None
                }
            }
        })
        .collect()
});

/// 이름으로 핵심 답변 조회
pub fn entry(name: &str) -> Option<&'static CriticalEntry> {
    CRITICAL_ENTRIES.iter().find(|e| e.name == name)
}

/// 키워드 3개 이상 일치하는 첫 핵심 답변 (신뢰도 1.0)
pub fn match_critical(query: &str) -> Option<AnswerCandidate> {
    let lower = query.to_lowercase();
    CRITICAL_ENTRIES
        .iter()
        .find(|e| e.keyword_hits(&lower) >= MIN_CRITICAL_MATCHES)
        .map(|e| {
            tracing::info!("Critical answer matched: {}", e.name);
            e.candidate(CRITICAL_CONFIDENCE, AnswerMethod::Critical)
        })
}

/// 정규식이 일치하는 첫 핵심 답변 (신뢰도 0.9)
pub fn match_pattern(query: &str) -> Option<AnswerCandidate> {
    let lower = query.to_lowercase();
    COMPILED_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, e)| {
            tracing::info!("Pattern answer matched: {}", e.name);
            e.candidate(PATTERN_CONFIDENCE, AnswerMethod::Pattern)
        })
}

/// 일반 폴백 후보 (항상 성공)
pub fn fallback_candidate() -> AnswerCandidate {
    AnswerCandidate::new(
        GENERAL_FALLBACK_BODY,
        GENERAL_FALLBACK_SOURCE,
        FALLBACK_CONFIDENCE,
        AnswerMethod::Fallback,
    )
}

/// 주제별 연락처 안내 (근거 후보가 전혀 없을 때 합성기가 사용)
pub fn topic_contact(query: &str) -> Option<(&'static str, &'static str)> {
    let lower = query.to_lowercase();

    if ["ic", "kad pengenalan", "mykad"].iter().any(|k| contains_term(&lower, k)) {
        return Some((
            "\
Untuk maklumat berkaitan MyKad dan Kad Pengenalan, hubungi JPN:
Laman web: https://www.jpn.gov.my
Talian: 1-300-88-4444
E-mel: pro@jpn.gov.my",
            "JPN (Jabatan Pendaftaran Negara)",
        ));
    }

    if contains_term(&lower, "apmm") {
        return Some((
            "\
Untuk maklumat berkaitan APMM:
Permohonan melalui SPA: https://www.spa.gov.my
Laman web: https://www.apmm.gov.my",
            "APMM (Agensi Penguatkuasaan Maritim Malaysia)",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_needs_three_keywords() {
        let hit = match_critical("Berapa bayaran jika cip IC rosak?").expect("critical hit");
        assert_eq!(hit.confidence, 1.0);
        assert_eq!(hit.source, "www.jpn.gov.my");
        assert_eq!(hit.method, AnswerMethod::Critical);

        // cip + rosak 두 개뿐
        assert!(match_critical("cip saya rosak").is_none());
    }

    #[test]
    fn test_critical_passport() {
        let hit = match_critical("Apakah syarat dan dokumen untuk pasport?").expect("passport hit");
        assert_eq!(hit.source, "www.imi.gov.my");
    }

    #[test]
    fn test_pattern_match() {
        // 키워드는 2개(pasport, syarat)뿐이지만 패턴은 일치
        assert!(match_critical("syarat pasport").is_none());
        let hit = match_pattern("syarat pasport").expect("pattern hit");
        assert_eq!(hit.confidence, 0.9);
        assert_eq!(hit.method, AnswerMethod::Pattern);
        assert_eq!(hit.source, "www.imi.gov.my");

        assert!(match_pattern("waktu operasi pejabat").is_none());
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED_PATTERNS.len(), PATTERNS.len());
    }

    #[test]
    fn test_answers_are_plain_text() {
        for entry in CRITICAL_ENTRIES {
            assert!(!entry.answer.contains("**"));
            assert!(!entry.answer.contains('#'));
        }
        assert!(!GENERAL_FALLBACK_BODY.contains("**"));
    }

    #[test]
    fn test_fallback_candidate() {
        let fallback = fallback_candidate();
        assert_eq!(fallback.source, GENERAL_FALLBACK_SOURCE);
        assert_eq!(fallback.confidence, 0.5);
    }

    #[test]
    fn test_topic_contact() {
        assert!(topic_contact("mykad hilang").is_some());
        assert!(topic_contact("menyertai APMM").is_some());
        assert!(topic_contact("lesen memandu").is_none());
    }
}
