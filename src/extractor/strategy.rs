//! 추출 전략 - 고정 우선순위의 닫힌 전략 집합
//!
//! 각 전략은 `(Page) -> Vec<QaItem>` 순수 함수입니다.

use scraper::ElementRef;

use crate::config::MAX_CONTENT_LENGTH;
use crate::error::ParseError;
use crate::knowledge::question::truncate_chars;
use crate::knowledge::{clean_text, looks_like_question, QaItem};

use super::page::{block_text, inline_text, is_heading, lines_of, Page};

/// 일반 폴백 레코드의 질문 자리 표시자
pub const GENERAL_QUESTION: &str = "General FAQ Information";

const QUESTION_SELECTOR: &str =
    "h3, h4, h5, h6, .question, .faq-question, .accordion-header, strong, b, dt";
const ACCORDION_SELECTORS: &[&str] = &[
    ".accordion-item",
    ".collapse",
    ".panel",
    "[data-toggle=\"collapse\"]",
    ".expandable",
];
const ACCORDION_HEADER_SELECTOR: &str =
    "h1, h2, h3, h4, h5, h6, .header, .title, .panel-heading, .accordion-header";
const ACCORDION_BODY_SELECTOR: &str =
    ".body, .content, .panel-body, .collapse-content, .accordion-body, .accordion-content";

/// 형제 요소 답변 누적 상한 (문자)
const SIBLING_ANSWER_CAP: usize = 500;
/// 답변으로 쓰기엔 너무 짧은 줄/요소
const MIN_PART_CHARS: usize = 10;
/// 구조/표/아코디언 전략의 최소 답변 길이
const MIN_ANSWER_CHARS: usize = 20;
/// 텍스트 패턴 전략의 최소 답변 길이
const MIN_TEXT_ANSWER_CHARS: usize = 30;
/// 일반 폴백이 의미 있으려면 필요한 본문 길이
const MIN_GENERAL_CHARS: usize = 100;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ============================================================================
// Strategy
// ============================================================================

/// 추출 전략 (실행 순서 = 선언 순서)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// 제목/강조/정의어 요소
    StructuredTag,
    /// 본문 줄 단위 선형 스캔
    TextPattern,
    /// 2열 이상 표
    Tabular,
    /// 아코디언/접이식 컨테이너
    Accordion,
    /// 본문 전체를 한 레코드로
    GenericFallback,
}

impl Strategy {
    /// 우선순위 순서
    pub const ORDER: [Strategy; 5] = [
        Strategy::StructuredTag,
        Strategy::TextPattern,
        Strategy::Tabular,
        Strategy::Accordion,
        Strategy::GenericFallback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::StructuredTag => "structured-tag",
            Strategy::TextPattern => "text-pattern",
            Strategy::Tabular => "tabular",
            Strategy::Accordion => "accordion",
            Strategy::GenericFallback => "generic-fallback",
        }
    }

    /// 전략 실행
    pub fn apply(&self, page: &Page) -> Result<Vec<QaItem>, ParseError> {
        match self {
            Strategy::StructuredTag => structured_tags(page),
            Strategy::TextPattern => Ok(text_pattern(page)),
            Strategy::Tabular => tables(page),
            Strategy::Accordion => accordions(page),
            Strategy::GenericFallback => Ok(generic_fallback(page)),
        }
    }
}

fn make_item(page: &Page, question: &str, answer: &str) -> Option<QaItem> {
    QaItem::new(question, answer, page.source_id.clone(), page.website.clone())
}

// ============================================================================
// 1. Structured tags
// ============================================================================

fn structured_tags(page: &Page) -> Result<Vec<QaItem>, ParseError> {
    let mut items = Vec::new();

    for element in page.select(QUESTION_SELECTOR)? {
        let question = inline_text(&element);
        if !looks_like_question(&question) {
            continue;
        }

        let answer = find_answer_for_element(&element, &question);
        if char_len(&answer) > MIN_ANSWER_CHARS {
            items.extend(make_item(page, &question, &answer));
        }
    }

    Ok(items)
}

/// 질문 요소에 대응하는 답변 찾기
///
/// (a) 다음 제목 전까지의 형제 노드 → (b) 부모의 다음 형제 → (c) 감싸는 블록에서 질문 제거
fn find_answer_for_element(element: &ElementRef, question: &str) -> String {
    // (a) 형제 노드
    let mut parts: Vec<String> = Vec::new();
    let mut total = 0;
    for sibling in element.next_siblings() {
        let text = match ElementRef::wrap(sibling) {
            Some(el) => {
                if is_heading(el.value().name()) {
                    break;
                }
                inline_text(&el)
            }
            None => match sibling.value().as_text() {
                Some(t) => clean_text(t),
                None => continue,
            },
        };

        if char_len(&text) > MIN_PART_CHARS {
            total += char_len(&text) + 1;
            parts.push(text);
            if total > SIBLING_ANSWER_CAP {
                break;
            }
        }
    }
    if !parts.is_empty() {
        return parts.join(" ");
    }

    // (b) 부모의 다음 형제 요소
    if let Some(next) = element
        .parent()
        .and_then(|p| p.next_siblings().find_map(ElementRef::wrap))
    {
        let text = inline_text(&next);
        if char_len(&text) > MIN_PART_CHARS {
            return text;
        }
    }

    // (c) 감싸는 블록
    let container = element.ancestors().filter_map(ElementRef::wrap).find(|e| {
        matches!(e.value().name(), "div" | "section" | "article" | "li")
    });
    if let Some(container) = container {
        let container_text = inline_text(&container);
        let answer = container_text.replacen(question, "", 1).trim().to_string();
        if char_len(&answer) > MIN_ANSWER_CHARS {
            return answer;
        }
    }

    String::new()
}

// ============================================================================
// 2. Text pattern
// ============================================================================

/// 줄 목록에서 질문-답변 쌍 선형 스캔
///
/// 질문 줄이 나오면 다음 질문 줄까지 10자 초과 줄을 답변으로 누적합니다.
pub fn scan_lines(lines: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !looks_like_question(&lines[i]) {
            i += 1;
            continue;
        }

        let question = lines[i].clone();
        let mut answer_parts: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < lines.len() && !looks_like_question(&lines[j]) {
            if char_len(&lines[j]) > MIN_PART_CHARS {
                answer_parts.push(&lines[j]);
            }
            j += 1;
        }

        if !answer_parts.is_empty() {
            pairs.push((question, answer_parts.join(" ")));
        }
        i = j;
    }

    pairs
}

fn text_pattern(page: &Page) -> Vec<QaItem> {
    page.content_areas()
        .iter()
        .flat_map(|area| scan_lines(&lines_of(&block_text(area))))
        .filter(|(_, answer)| char_len(answer) > MIN_TEXT_ANSWER_CHARS)
        .filter_map(|(q, a)| make_item(page, &q, &a))
        .collect()
}

// ============================================================================
// 3. Tables
// ============================================================================

fn tables(page: &Page) -> Result<Vec<QaItem>, ParseError> {
    let cell_selector = super::page::selector("td, th")?;
    let mut items = Vec::new();

    for row in page.select("table tr")? {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 2 {
            continue;
        }

        let question = inline_text(&cells[0]);
        let answer = inline_text(&cells[1]);
        if looks_like_question(&question) && char_len(&answer) > MIN_ANSWER_CHARS {
            items.extend(make_item(page, &question, &answer));
        }
    }

    Ok(items)
}

// ============================================================================
// 4. Accordions
// ============================================================================

fn accordions(page: &Page) -> Result<Vec<QaItem>, ParseError> {
    let header_selector = super::page::selector(ACCORDION_HEADER_SELECTOR)?;
    let body_selector = super::page::selector(ACCORDION_BODY_SELECTOR)?;
    let mut items = Vec::new();

    for css in ACCORDION_SELECTORS {
        for container in page.select(css)? {
            let Some(header) = container.select(&header_selector).next() else {
                continue;
            };

            let question = inline_text(&header);
            if !looks_like_question(&question) {
                continue;
            }

            let answer = match container.select(&body_selector).next() {
                Some(body) => inline_text(&body),
                None => inline_text(&container)
                    .replacen(&question, "", 1)
                    .trim()
                    .to_string(),
            };

            if char_len(&answer) > MIN_ANSWER_CHARS {
                items.extend(make_item(page, &question, &answer));
            }
        }
    }

    Ok(items)
}

// ============================================================================
// 5. Generic fallback
// ============================================================================

fn generic_fallback(page: &Page) -> Vec<QaItem> {
    let text = page.main_text();
    if char_len(&text) <= MIN_GENERAL_CHARS {
        return Vec::new();
    }

    make_item(page, GENERAL_QUESTION, truncate_chars(&text, MAX_CONTENT_LENGTH))
        .into_iter()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Document;

    fn page(html: &str) -> Page {
        Page::parse(&Document::new("https://www.rmp.gov.my/faq", html))
    }

    #[test]
    fn test_structured_tag_siblings() {
        let p = page(
            r#"<html><body><main>
                <h3>Bagaimana memohon permit polis?</h3>
                <p>Permohonan dibuat melalui balai polis berhampiran.</p>
                <p>Bawa kad pengenalan dan borang lengkap.</p>
                <h3>Berapakah yuran permit?</h3>
                <p>Tiada bayaran dikenakan untuk permit ini.</p>
            </main></body></html>"#,
        );
        let items = Strategy::StructuredTag.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question, "Bagaimana memohon permit polis?");
        assert!(items[0].answer.contains("balai polis"));
        assert!(items[0].answer.contains("borang lengkap"));
        assert!(!items[0].answer.contains("yuran"));
        assert_eq!(items[0].agency_tag, "www.rmp.gov.my");
    }

    #[test]
    fn test_structured_tag_container_fallback() {
        let p = page(
            r#"<html><body><div>
                <strong>Adakah pendaftaran percuma?</strong>
            </div><div>Ya, pendaftaran adalah percuma untuk semua warganegara.</div></body></html>"#,
        );
        let items = Strategy::StructuredTag.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert!(items[0].answer.starts_with("Ya, pendaftaran"));
    }

    #[test]
    fn test_structured_tag_enclosing_block() {
        // 형제도 없고 부모의 다음 형제도 없음 → 감싸는 div에서 질문을 뺀 텍스트
        let p = page(
            r#"<html><body><div>Pendaftaran pertubuhan adalah percuma untuk semua warganegara.
                <span><strong>Adakah pendaftaran percuma?</strong></span></div></body></html>"#,
        );
        let items = Strategy::StructuredTag.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "Adakah pendaftaran percuma?");
        assert_eq!(
            items[0].answer,
            "Pendaftaran pertubuhan adalah percuma untuk semua warganegara."
        );
    }

    #[test]
    fn test_scan_lines() {
        let lines: Vec<String> = [
            "Apakah MyKad?",
            "MyKad ialah kad pengenalan pintar.",
            "ok",
            "Siapa perlu mendaftar?",
            "Semua warganegara berumur 12 tahun.",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let pairs = scan_lines(&lines);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1, "MyKad ialah kad pengenalan pintar.");
        assert_eq!(pairs[1].0, "Siapa perlu mendaftar?");
    }

    #[test]
    fn test_text_pattern_requires_substantial_answer() {
        let p = page(
            r#"<html><body><main>
                <p>Apakah waktu operasi kaunter?</p>
                <p>Isnin-Jumaat</p>
                <p>Bagaimana membuat temujanji dalam talian?</p>
                <p>Layari portal rasmi dan pilih cawangan serta tarikh temujanji.</p>
            </main></body></html>"#,
        );
        let items = Strategy::TextPattern.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "Bagaimana membuat temujanji dalam talian?");
    }

    #[test]
    fn test_tabular() {
        let p = page(
            r#"<html><body><table>
                <tr><th>Soalan</th><th>Jawapan</th></tr>
                <tr><td>Berapakah kos pasport?</td><td>RM200 untuk pasport 32 halaman.</td></tr>
                <tr><td>Berapa lama proses?</td><td>Satu hari</td></tr>
            </table></body></html>"#,
        );
        let items = Strategy::Tabular.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "Berapakah kos pasport?");
    }

    #[test]
    fn test_accordion_body_and_fallback() {
        let p = page(
            r#"<html><body>
                <div class="accordion-item">
                    <h4>Bagaimana menyertai RELA?</h4>
                    <div class="accordion-body">Isi borang keanggotaan di pejabat RELA daerah.</div>
                </div>
                <div class="panel">
                    <div class="title">Siapa layak menjadi ahli?</div>
                    Warganegara Malaysia berumur 16 tahun ke atas.
                </div>
            </body></html>"#,
        );
        let items = Strategy::Accordion.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].answer, "Isi borang keanggotaan di pejabat RELA daerah.");
        assert_eq!(items[1].answer, "Warganegara Malaysia berumur 16 tahun ke atas.");
    }

    #[test]
    fn test_generic_fallback() {
        let body = "Maklumat am jabatan. ".repeat(10);
        let p = page(&format!("<html><body><main>{}</main></body></html>", body));
        let items = Strategy::GenericFallback.apply(&p).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, GENERAL_QUESTION);

        let short = page("<html><body><main>Pendek.</main></body></html>");
        assert!(Strategy::GenericFallback.apply(&short).unwrap_or_default().is_empty());
    }
}
