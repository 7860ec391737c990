//! soalan-lazim - 정부 FAQ 질의응답 엔진
//!
//! 말레이시아 정부 기관 FAQ 페이지와 로컬 FAQ 코퍼스에서 Q&A를 추출하고,
//! 5계층 폴백(핵심 답변 → 패턴 → 딥서치 → 코퍼스 검색 → 일반 안내)으로
//! 답변을 고른 뒤 생성 모델로 합성합니다.

pub mod answer;
pub mod cli;
pub mod collector;
pub mod config;
pub mod deep_search;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod scraper;

// Re-exports
pub use answer::{AnswerService, CorpusIndex, Orchestrator, Response, Synthesizer};
pub use config::Config;
pub use deep_search::{DeepCandidate, DeepSearcher};
pub use error::{FetchError, LoadError, ModelError, ParseError};
pub use extractor::{Extractor, GrammarParser};
pub use knowledge::{AnswerCandidate, AnswerMethod, Corpus, Document, FormattedAnswer, QaItem};
pub use llm::{GenerativeModelClient, OpenAiCompatClient};
pub use scraper::{CachedSource, ContentSource, FetchCache, FileSource, WebScraper};
