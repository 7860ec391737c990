//! 추출 모듈 - 문서를 Q&A 레코드로 변환
//!
//! - 웹 문서: 다중 전략 추출기 (`strategy`)
//! - 주석이 달린 평문 코퍼스: 관용 문법 파서 (`grammar`)

pub mod grammar;
pub mod page;
pub mod strategy;

use crate::knowledge::{dedup_items, Document, QaItem};

pub use grammar::{agency_for_title, Grammar, GrammarParser, Section};
pub use page::Page;
pub use strategy::{scan_lines, Strategy, GENERAL_QUESTION};

/// 이 개수를 넘으면 "좋은 구조화 결과"로 보고 이후 전략을 건너뜀
const GOOD_RESULT_THRESHOLD: usize = 3;

// ============================================================================
// Extractor
// ============================================================================

/// 다중 전략 추출기
///
/// 전략을 고정 순서로 실행하고, 한 전략이 3개 초과를 내면 중단합니다.
/// 일반 폴백은 앞선 전략이 아무것도 찾지 못했을 때만 실행됩니다.
#[derive(Debug, Clone, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// 문서 하나에서 Q&A 레코드 추출
    pub fn extract(&self, doc: &Document) -> Vec<QaItem> {
        let page = Page::parse(doc);
        let mut items: Vec<QaItem> = Vec::new();

        for strategy in Strategy::ORDER {
            if strategy == Strategy::GenericFallback && !items.is_empty() {
                break;
            }

            let found = match strategy.apply(&page) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Strategy {} failed on {}: {}", strategy.name(), doc.source_id, e);
                    continue;
                }
            };

            tracing::debug!(
                "Strategy {} found {} items on {}",
                strategy.name(),
                found.len(),
                doc.source_id
            );

            let good = found.len() > GOOD_RESULT_THRESHOLD;
            items.extend(found);
            if good {
                break;
            }
        }

        let items = dedup_items(items);
        tracing::info!("Extracted {} FAQ items from {}", items.len(), doc.source_id);
        items
    }
}

// ============================================================================
// Tests
// ============================================================================
