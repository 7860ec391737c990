//! 파싱된 페이지 - 노이즈 제거 + 텍스트 추출 헬퍼
//!
//! `scraper::Html`은 `Send`가 아니므로 페이지는 항상 동기 함수 안에서
//! 만들고 버립니다.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::knowledge::{clean_text, Document};

/// 전략 실행 전에 제거하는 영역
const NOISE_SELECTOR: &str = "nav, footer, header, script, style, aside, noscript, menu, iframe";

/// 본문 영역 후보 (우선순위 순, 처음 매칭된 셀렉터만 사용)
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".main-content",
    ".page-content",
    ".entry-content",
    "#content",
    ".container",
    ".wrapper",
    "body",
];

/// 줄바꿈을 만드는 블록 요소
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "details", "div", "dl", "dt", "figcaption",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section",
    "summary", "table", "td", "th", "tr", "ul",
];

/// 딥서치 의미 블록 후보
const BLOCK_SELECTOR: &str = "div, section, article, p, li, td";

/// CSS 셀렉터 파싱
pub fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError {
        what: format!("selector `{}`", css),
        cause: format!("{:?}", e),
    })
}

/// 제목 태그 여부
pub fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// 요소의 인라인 텍스트 (정리됨)
pub fn inline_text(element: &ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

/// 블록 요소 경계에 줄바꿈을 넣은 텍스트
pub fn block_text(element: &ElementRef) -> String {
    let mut out = String::new();
    push_block_text(element, &mut out);
    out
}

fn push_block_text(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    let is_block = BLOCK_TAGS.contains(&el.name());
                    if is_block {
                        out.push('\n');
                    }
                    push_block_text(&child_el, out);
                    if is_block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

/// 비어있지 않은 trim된 줄 목록
pub fn lines_of(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

// ============================================================================
// Page
// ============================================================================

/// 노이즈가 제거된 파싱 페이지
pub struct Page {
    html: Html,
    /// 원본 source_id
    pub source_id: String,
    /// 웹사이트 (에이전시 태그로 사용)
    pub website: String,
}

impl Page {
    /// 문서 파싱 후 내비게이션/푸터/스크립트 영역 제거
    pub fn parse(doc: &Document) -> Self {
        let mut html = Html::parse_document(&doc.body);

        match selector(NOISE_SELECTOR) {
            Ok(noise) => {
                let ids: Vec<_> = html.select(&noise).map(|e| e.id()).collect();
                for id in ids {
                    if let Some(mut node) = html.tree.get_mut(id) {
                        node.detach();
                    }
                }
            }
            Err(e) => tracing::warn!("Noise stripping skipped: {}", e),
        }

        Self {
            html,
            source_id: doc.source_id.clone(),
            website: doc.website(),
        }
    }

    /// 루트 요소
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// CSS 셀렉터로 요소 선택
    pub fn select(&self, css: &str) -> Result<Vec<ElementRef<'_>>, ParseError> {
        let sel = selector(css)?;
        Ok(self.html.select(&sel).collect())
    }

    /// 본문 영역 (처음 매칭되는 셀렉터의 모든 요소)
    pub fn content_areas(&self) -> Vec<ElementRef<'_>> {
        for css in CONTENT_SELECTORS {
            match self.select(css) {
                Ok(areas) if !areas.is_empty() => return areas,
                Ok(_) => {}
                Err(e) => tracing::debug!("{}", e),
            }
        }
        vec![self.root()]
    }

    /// 전체 텍스트 (블록 경계 줄바꿈 유지)
    pub fn full_text(&self) -> String {
        block_text(&self.root())
    }

    /// 본문 영역의 정리된 텍스트
    pub fn main_text(&self) -> String {
        self.content_areas()
            .iter()
            .map(|area| clean_text(&block_text(area)))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 딥서치용 콘텐츠 블록 텍스트
    pub fn content_blocks(&self) -> Vec<String> {
        match self.select(BLOCK_SELECTOR) {
            Ok(blocks) => blocks
                .iter()
                .map(|b| block_text(b).trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::parse(&Document::new("https://www.jpn.gov.my/faq", html))
    }

    #[test]
    fn test_noise_removed() {
        let p = page(
            r#"<html><body>
                <nav>Laman Utama | Hubungi</nav>
                <script>var x = 1;</script>
                <main><p>Kandungan utama halaman soalan lazim.</p></main>
                <footer>Hak cipta</footer>
            </body></html>"#,
        );
        let text = p.full_text();
        assert!(text.contains("Kandungan utama"));
        assert!(!text.contains("Laman Utama"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Hak cipta"));
        assert_eq!(p.website, "www.jpn.gov.my");
    }

    #[test]
    fn test_block_text_splits_lines() {
        let p = page("<html><body><div><p>Satu</p><p>Dua<br>Tiga</p></div></body></html>");
        let lines = lines_of(&p.full_text());
        assert_eq!(lines, vec!["Satu", "Dua", "Tiga"]);
    }

    #[test]
    fn test_content_areas_prefer_main() {
        let p = page(
            "<html><body><div class='content'>A</div><main>B</main></body></html>",
        );
        let areas = p.content_areas();
        assert_eq!(areas.len(), 1);
        assert_eq!(inline_text(&areas[0]), "B");
    }

    #[test]
    fn test_content_areas_fall_back_to_body() {
        let p = page("<html><body><p>Only body</p></body></html>");
        assert_eq!(p.main_text(), "Only body");
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        let err = selector("<<<").err();
        assert!(err.is_some());
    }
}
