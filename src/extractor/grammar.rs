//! 코퍼스 텍스트 문법 파서
//!
//! `## 제목` 줄로 섹션을 나누고, 섹션마다 기관 태그를 붙인 뒤
//! 여러 관용 문법을 같은 텍스트에 순서대로 적용합니다.
//! 문법 간 중복은 이 계층에서 제거하지 않습니다 (`dedup_items` 참고).
//!
//! 지원 형식:
//! ```text
//! **Q1: 질문?**
//! A: 답변
//!
//! 1. 질문?
//! Jawapan :
//! 답변
//!
//! Q: 질문?
//! A: 답변
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::knowledge::{Document, QaItem};

/// 기본 기관 태그
pub const DEFAULT_AGENCY: &str = "KERAJAAN MALAYSIA";

/// 섹션 제목 키워드 → 기관 (가장 긴 키워드 우선)
const AGENCY_TABLE: &[(&str, &str)] = &[
    ("PUSPEN", "AADK"),
    ("NADA", "AADK"),
    ("PENGAMBILAN", "PDRM"),
    ("PASUKAN SUKARELAWAN POLIS", "PDRM"),
    ("TRAFIK", "PDRM"),
    ("LESEN SENJATA API", "PDRM"),
    ("APMM", "APMM"),
    ("PENDAFTARAN PERTUBUHAN", "ROS"),
    ("KAD PENGENALAN", "JPN"),
    ("KELAHIRAN", "JPN"),
    ("RELA", "RELA"),
    ("KESELAMATAN", "KDN"),
    ("PIROTEKNIK", "KDN"),
    ("SENJATA API", "KDN"),
    ("KAWALAN PENERBITAN", "KDN"),
    ("PENAPISAN FILEM", "KDN"),
    ("PENDAFTARAN NEGARA", "KDN"),
    ("KOMUNIKASI KORPORAT", "KDN"),
    ("AKAUN", "KDN"),
    ("PENCEGAHAN JENAYAH", "KDN"),
    ("LEMBAGA PAROL", "KDN"),
    ("KHIDMAT PENGURUSAN", "KDN"),
    ("TAPISAN KESELAMATAN", "KDN"),
    ("IPCC", "KDN"),
];

/// 수동 스캔을 트리거하는 주제어
const MANUAL_SCAN_TRIGGERS: &[&str] = &["prosedur", "al-quran", "quran"];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("grammar regex must compile")
}

// 질문 헤더 (답변 시작 직전까지 매칭)
static EMPHASIZED_Q: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\*\*Q\d+:\s*([^*]+?)\*\*\s*\n\s*A:[ \t]*"));
static NUMBERED_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^[ \t]*\d+\.[ \t]*([^?\n]+\?[^\n]*)\n(?:[ \t]*\n)*(?:[ \t]*Jawapan[ \t]*:?[ \t]*\n)?")
});
static NUMBERED_JAWAPAN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^[ \t]*\d+\.[ \t]*([^?\n]+\?)[ \t]*\n(?:[ \t]*\n)*[ \t]*Jawapan[ \t]*:[ \t]*\n")
});
static NUMBERED_BARE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^[ \t]*\d+[ \t]+([^?\n]+\?)[ \t]*\n(?:[ \t]*\n)*[ \t]*Jawapan[ \t]*:[ \t]*\n")
});
static PLAIN_QA: LazyLock<Regex> =
    LazyLock::new(|| compile(r"Q:[ \t]*([^?\n]+\?)[ \t]*\n\s*A:[ \t]*"));

// 다음 항목 시작 (답변 종료 지점)
static NEXT_EMPHASIZED: LazyLock<Regex> = LazyLock::new(|| compile(r"\n\*\*"));
static NEXT_NUMBERED: LazyLock<Regex> = LazyLock::new(|| compile(r"\n[ \t]*\d+[ \t]*\."));
static NEXT_NUMBERED_BARE: LazyLock<Regex> = LazyLock::new(|| compile(r"\n[ \t]*\d+[ \t]+"));
static NEXT_PLAIN: LazyLock<Regex> = LazyLock::new(|| compile(r"\nQ:"));

// 섹션 경계 (구분선 / 하위 제목)
static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| compile(r"\n(?:---|##)"));
static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d+\."));
static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d+\.\s*"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| compile(r"\n[ \t]*\n(?:[ \t]*\n)*"));

// ============================================================================
// Sections
// ============================================================================

/// 제목이 붙은 코퍼스 섹션
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub agency: &'static str,
    pub body: String,
}

/// 섹션 제목에서 기관 태그 결정
pub fn agency_for_title(title: &str) -> &'static str {
    let upper = title.to_uppercase();
    AGENCY_TABLE
        .iter()
        .filter(|(key, _)| upper.contains(key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, agency)| *agency)
        .unwrap_or(DEFAULT_AGENCY)
}

/// `## ` 줄 기준으로 섹션 분할
///
/// 첫 섹션 표시 전의 텍스트는 제목 없는 섹션이 됩니다.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = String::new();
    let mut body = String::new();

    let mut flush = |title: &str, body: &mut String| {
        if !body.trim().is_empty() {
            sections.push(Section {
                title: title.to_string(),
                agency: agency_for_title(title),
                body: std::mem::take(body),
            });
        } else {
            body.clear();
        }
    };

    for line in text.lines() {
        if line.starts_with("## ") {
            flush(&title, &mut body);
            title = line.trim_start_matches('#').trim().to_string();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&title, &mut body);

    sections
}

// ============================================================================
// Grammar
// ============================================================================

/// 관용 문법 (적용 순서 = 선언 순서)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// `**Q1: 질문?**` + `A: 답변`
    EmphasizedQ,
    /// `1. 질문?` + 선택적 `Jawapan:` + 답변
    NumberedLoose,
    /// `1. 질문?` + 빈 줄/탭 + 필수 `Jawapan :` + 답변
    NumberedJawapan,
    /// `1 질문?` (마침표 없음) + `Jawapan :` + 답변
    NumberedBare,
    /// `Q: 질문?` + `A: 답변`
    PlainQa,
    /// 주제어가 있는 번호 질문 + 몇 줄 아래의 `Jawapan` 라벨
    ManualJawapanScan,
}

impl Grammar {
    pub const ORDER: [Grammar; 6] = [
        Grammar::EmphasizedQ,
        Grammar::NumberedLoose,
        Grammar::NumberedJawapan,
        Grammar::NumberedBare,
        Grammar::PlainQa,
        Grammar::ManualJawapanScan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Grammar::EmphasizedQ => "emphasized-q",
            Grammar::NumberedLoose => "numbered-loose",
            Grammar::NumberedJawapan => "numbered-jawapan",
            Grammar::NumberedBare => "numbered-bare",
            Grammar::PlainQa => "plain-qa",
            Grammar::ManualJawapanScan => "manual-jawapan-scan",
        }
    }

    /// 이 길이 이하의 답변은 버림 (문자 수)
    pub fn min_answer_chars(&self) -> usize {
        match self {
            Grammar::EmphasizedQ | Grammar::PlainQa => 0,
            Grammar::NumberedLoose | Grammar::NumberedJawapan | Grammar::NumberedBare => 20,
            Grammar::ManualJawapanScan => 30,
        }
    }

    /// 섹션 본문에서 (질문, 답변) 쌍 추출
    pub fn pairs(&self, body: &str) -> Vec<(String, String)> {
        let raw = match self {
            Grammar::EmphasizedQ => header_pairs(body, &EMPHASIZED_Q, &NEXT_EMPHASIZED),
            Grammar::NumberedLoose => header_pairs(body, &NUMBERED_LOOSE, &NEXT_NUMBERED),
            Grammar::NumberedJawapan => header_pairs(body, &NUMBERED_JAWAPAN, &NEXT_NUMBERED),
            Grammar::NumberedBare => header_pairs(body, &NUMBERED_BARE, &NEXT_NUMBERED_BARE),
            Grammar::PlainQa => header_pairs(body, &PLAIN_QA, &NEXT_PLAIN),
            Grammar::ManualJawapanScan => manual_jawapan_scan(body),
        };

        let min = self.min_answer_chars();
        raw.into_iter()
            .filter(|(q, a)| !q.is_empty() && !a.is_empty() && a.chars().count() > min)
            .collect()
    }
}

/// 헤더 매칭 후 다음 항목/경계까지를 답변으로 취함
fn header_pairs(body: &str, header: &Regex, next_item: &Regex) -> Vec<(String, String)> {
    header
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let question = caps.get(1)?.as_str().trim().to_string();
            let start = whole.end();
            let end = [
                next_item.find_at(body, start).map(|m| m.start()),
                BOUNDARY.find_at(body, start).map(|m| m.start()),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(body.len());

            Some((question, tidy_answer(&body[start..end])))
        })
        .collect()
}

/// 빈 줄 연속을 하나로 줄이고 앞뒤 공백 제거
fn tidy_answer(answer: &str) -> String {
    BLANK_RUNS.replace_all(answer.trim(), "\n\n").to_string()
}

/// 엄격한 문법이 놓치는 불규칙 배치용 줄 단위 스캔
fn manual_jawapan_scan(body: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = body.lines().map(|l| l.trim()).collect();
    let mut pairs = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !NUMBERED_LINE.is_match(line) {
            continue;
        }
        let lower = line.to_lowercase();
        if !MANUAL_SCAN_TRIGGERS.iter().any(|t| lower.contains(t)) {
            continue;
        }

        let question = NUMBER_PREFIX.replace(line, "").trim().to_string();
        if !question.contains('?') {
            continue;
        }

        // 다음 번호 항목 전까지 Jawapan 라벨 탐색
        let label = lines[i + 1..]
            .iter()
            .position(|l| l.to_lowercase().contains("jawapan") || NUMBERED_LINE.is_match(l))
            .map(|offset| i + 1 + offset)
            .filter(|&j| !NUMBERED_LINE.is_match(lines[j]));
        let Some(label) = label else {
            continue;
        };

        let answer: Vec<&str> = lines[label + 1..]
            .iter()
            .take_while(|l| !NUMBERED_LINE.is_match(l))
            .filter(|l| !l.is_empty())
            .copied()
            .collect();

        if !answer.is_empty() {
            pairs.push((question, answer.join("\n")));
        }
    }

    pairs
}

// ============================================================================
// GrammarParser
// ============================================================================

/// 코퍼스 텍스트 → Q&A 레코드
#[derive(Debug, Clone, Default)]
pub struct GrammarParser;

impl GrammarParser {
    pub fn new() -> Self {
        Self
    }

    /// 문서 전체 파싱 (문법 간 중복 포함)
    pub fn parse(&self, doc: &Document) -> Vec<QaItem> {
        let mut items = Vec::new();

        for section in split_sections(&doc.body) {
            for grammar in Grammar::ORDER {
                let pairs = grammar.pairs(&section.body);
                if !pairs.is_empty() {
                    tracing::debug!(
                        "Grammar {} matched {} pairs in section {:?}",
                        grammar.name(),
                        pairs.len(),
                        section.title
                    );
                }

                items.extend(pairs.into_iter().filter_map(|(q, a)| {
                    QaItem::new(&q, &a, doc.source_id.clone(), section.agency)
                        .map(|item| item.with_category(section.title.clone()))
                }));
            }
        }

        tracing::info!("Parsed {} FAQ items from {}", items.len(), doc.source_id);
        items
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::dedup_items;

    fn parse(text: &str) -> Vec<QaItem> {
        GrammarParser::new().parse(&Document::new("faq.txt", text))
    }

    #[test]
    fn test_emphasized_fixture() {
        let items = parse("## Section A\n**Q1: What is X?**\nA: X is Y.\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "What is X?");
        assert_eq!(items[0].answer, "X is Y.");
        assert_eq!(items[0].agency_tag, DEFAULT_AGENCY);
        assert_eq!(items[0].category.as_deref(), Some("Section A"));
    }

    #[test]
    fn test_emphasized_multiple_and_rule_boundary() {
        let text = "## KAD PENGENALAN\n\
                    **Q1: Berapa bayaran ganti MyKad?**\n\
                    A: RM10 bagi penggantian pertama.\n\
                    **Q2: Di mana boleh memohon?**\n\
                    A: Di mana-mana pejabat JPN.\n\
                    ---\n\
                    Nota kaki yang tidak berkaitan.\n";
        let items = parse(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].answer, "RM10 bagi penggantian pertama.");
        assert_eq!(items[1].answer, "Di mana-mana pejabat JPN.");
        assert!(items.iter().all(|i| i.agency_tag == "JPN"));
    }

    #[test]
    fn test_numbered_grammars_overlap_then_dedup() {
        let text = "## KAWALAN PENERBITAN DAN TEKS AL-QURAN\n\
                    1.\tApakah prosedur untuk mendapatkan kelulusan pencetakan Al-Quran?\n\
                    \t\n\
                    Jawapan :\n\
                    Permohonan hendaklah dibuat melalui Sistem UPQ di portal KDN.\n\
                    2. Berapakah tempoh kelulusan?\n\
                    Kelulusan diberikan dalam tempoh 14 hari bekerja selepas permohonan lengkap.\n";
        let items = parse(text);

        // numbered-loose(2) + numbered-jawapan(1) + manual scan(1)
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| i.agency_tag == "KDN"));
        assert_eq!(
            items[0].answer,
            "Permohonan hendaklah dibuat melalui Sistem UPQ di portal KDN."
        );

        let deduped = dedup_items(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[1].question, "Berapakah tempoh kelulusan?");
    }

    #[test]
    fn test_numbered_short_answer_discarded() {
        let items = parse("## RELA\n1. Adakah latihan wajib?\nYa.\n");
        assert!(items.is_empty());
    }

    #[test]
    fn test_numbered_bare() {
        let text = "## PENDAFTARAN PERTUBUHAN\n\
                    3 Bagaimana menukar alamat berdaftar?\n\
                    \n\
                    Jawapan :\n\
                    Kemaskini alamat melalui sistem eROSES dalam tempoh 60 hari.\n";
        let pairs = Grammar::NumberedBare.pairs(&split_sections(text)[0].body);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "Bagaimana menukar alamat berdaftar?");
        assert_eq!(agency_for_title("PENDAFTARAN PERTUBUHAN"), "ROS");
    }

    #[test]
    fn test_plain_qa() {
        let items = parse("## APMM\nQ: Bagaimana menyertai APMM?\nA: Mohon melalui SPA.\nQ: Apakah gred?\nA: T1 hingga T13.\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].answer, "Mohon melalui SPA.");
        assert_eq!(items[1].answer, "T1 hingga T13.");
        assert_eq!(items[0].agency_tag, "APMM");
    }

    #[test]
    fn test_manual_scan_irregular_layout() {
        // 질문과 Jawapan 사이에 설명 줄이 있어 엄격한 문법은 놓침
        let body = "5. Apakah prosedur semakan teks al-Quran?\n\
                    (Rujuk garis panduan)\n\
                    Jawapan :\n\
                    Teks perlu disemak oleh LPPPQ sebelum dicetak dan diedarkan.\n\
                    6. Lain-lain?\n";
        let pairs = Grammar::ManualJawapanScan.pairs(body);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].1,
            "Teks perlu disemak oleh LPPPQ sebelum dicetak dan diedarkan."
        );
        assert!(Grammar::NumberedJawapan.pairs(body).is_empty());
    }

    #[test]
    fn test_agency_longest_match_wins() {
        assert_eq!(agency_for_title("Lesen Senjata Api"), "PDRM");
        assert_eq!(agency_for_title("Permit Senjata Api"), "KDN");
        assert_eq!(agency_for_title("Soalan Umum"), DEFAULT_AGENCY);
    }

    #[test]
    fn test_split_sections() {
        let sections = split_sections("Pengenalan\n## RELA\nisi\n## Kosong\n\n### Sub\nx\n");
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[1].title, "RELA");
        assert_eq!(sections[1].agency, "RELA");
        assert_eq!(sections[2].body, "\n### Sub\nx\n");
    }
}
