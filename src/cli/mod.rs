//! CLI 모듈
//!
//! soalan-lazim CLI 명령어 정의 및 구현

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::answer::{self, AnswerService, SourceOutcome};
use crate::config::Config;
use crate::deep_search::classify;
use crate::extractor::GrammarParser;
use crate::knowledge::{dedup_items, Document, DEFAULT_RANK_LIMIT};
use crate::scraper::{ContentSource, FileSource};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "soalan-lazim")]
#[command(version, about = "정부 FAQ 질의응답 엔진 (말레이어/영어)", long_about = None)]
pub struct Cli {
    /// 로컬 FAQ 코퍼스 파일 또는 디렉토리 (기본: FAQ_FILE)
    #[arg(long, global = true)]
    pub faq_file: Option<PathBuf>,

    /// 크롤링할 URL (여러 번 지정 가능, 기본: FAQ_SOURCES)
    #[arg(long = "source", global = true)]
    pub sources: Vec<String>,

    /// 동시 fetch 워커 수
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 질문에 답변
    Ask {
        /// 질문 (말레이어 또는 영어)
        query: String,

        /// 답변한 계층과 신뢰도 표시
        #[arg(short, long)]
        verbose: bool,
    },

    /// 모든 웹 소스를 가져와서 추출 결과 보고
    Crawl,

    /// 로컬 코퍼스 파일 파싱 결과 보고
    Parse {
        /// 코퍼스 파일 (기본: --faq-file)
        file: Option<PathBuf>,
    },

    /// 코퍼스 관련도 검색
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value_t = DEFAULT_RANK_LIMIT)]
        limit: usize,
    },

    /// 상태 확인
    Status,
}

impl Cli {
    /// 환경변수 설정 위에 명령행 옵션 적용
    pub fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(ref path) = self.faq_file {
            config.faq_file = path.clone();
        }
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(workers) = self.workers {
            config.fetch_workers = workers.max(1);
        }
        config
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.config();

    match cli.command {
        Commands::Ask { query, verbose } => cmd_ask(&config, &query, verbose).await,
        Commands::Crawl => cmd_crawl(&config).await,
        Commands::Parse { file } => {
            let path = file.unwrap_or_else(|| config.faq_file.clone());
            cmd_parse(&path).await
        }
        Commands::Search { query, limit } => cmd_search(&config, &query, limit).await,
        Commands::Status => cmd_status(&config).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질문 명령어 (ask)
async fn cmd_ask(config: &Config, query: &str, verbose: bool) -> Result<()> {
    let service = AnswerService::from_config(config)
        .await
        .context("AnswerService 초기화 실패")?;

    let response = service.respond(query).await;

    if verbose {
        let method = response.method.map(|m| m.as_str()).unwrap_or("none");
        println!("[*] 계층: {} (신뢰도 {:.2})", method, response.confidence);
        if let Some(profile) = profile_name(query) {
            println!("[*] 딥서치 유형: {}", profile);
        }
        println!();
    }

    println!("{}", response.answer.body);

    Ok(())
}

/// 크롤 명령어 (crawl)
///
/// 모든 웹 소스를 가져와서 소스별 추출 건수를 보고합니다.
async fn cmd_crawl(config: &Config) -> Result<()> {
    println!("[*] {} 개 소스 크롤링 중...", config.sources.len());

    let web = answer::cached_web_source(config).context("WebScraper 생성 실패")?;
    let index = answer::CorpusIndex::new(web, config.sources.clone(), config.fetch_workers);
    let reports = index.refresh().await.context("크롤링 실패")?;

    let mut total = 0;
    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            SourceOutcome::Extracted { items } => {
                total += items;
                println!("[OK] {:>3} 건  {}", items, report.source_id);
            }
            SourceOutcome::Unchanged => println!("[OK]   변경 없음  {}", report.source_id),
            SourceOutcome::Failed { cause } => {
                failed += 1;
                println!("[!] 실패  {}", report.source_id);
                println!("     {}", truncate_text(cause, 120));
            }
        }
    }

    println!();
    println!("[OK] 완료: Q&A {} 건, 실패 소스 {}", total, failed);

    Ok(())
}

/// 파싱 명령어 (parse)
///
/// 코퍼스 파일을 문법 파서로 파싱하고 기관별 건수를 보고합니다.
async fn cmd_parse(path: &std::path::Path) -> Result<()> {
    println!("[*] 코퍼스 파싱 중: {}", path.display());

    let doc = FileSource
        .fetch(&path.to_string_lossy())
        .await
        .context("코퍼스 파일 로드 실패")?;

    let raw = GrammarParser::new().parse(&doc);
    let raw_count = raw.len();
    let items = dedup_items(raw);

    if items.is_empty() {
        println!("[!] 추출된 Q&A가 없습니다.");
        return Ok(());
    }

    let mut by_agency: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &items {
        *by_agency.entry(item.agency_tag.as_str()).or_default() += 1;
    }

    println!("[OK] Q&A {} 건 (중복 제거 전 {} 건)\n", items.len(), raw_count);
    for (agency, count) in by_agency {
        println!("  {:<40} {:>4}", agency, count);
    }

    Ok(())
}

/// 검색 명령어 (search)
///
/// 로컬 코퍼스 + 웹 소스를 관련도 순으로 검색합니다.
async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    let web = answer::cached_web_source(config).context("WebScraper 생성 실패")?;
    let index = answer::build_index(config, web).await;
    let results = index.search(query, limit).await.context("검색 실패")?;

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, item) in results.iter().enumerate() {
        println!("{}. [{}] [점수: {:.1}]", i + 1, item.agency_tag, item.score);
        println!("   Q: {}", truncate_text(&item.question, 200));
        println!("   A: {}", truncate_text(&item.answer, 200));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &Config) -> Result<()> {
    println!("soalan-lazim v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // 로컬 코퍼스
    match FileSource.fetch(&config.faq_file.to_string_lossy()).await {
        Ok(doc) => {
            let count = local_item_count(&doc);
            println!(
                "[OK] FAQ 코퍼스: {} ({}, Q&A {} 건)",
                config.faq_file.display(),
                format_bytes(doc.body.len()),
                count
            );
        }
        Err(e) => {
            println!("[!] FAQ 코퍼스: {}", config.faq_file.display());
            tracing::debug!("코퍼스 로드 실패: {}", e);
            println!("    설정: export FAQ_FILE=path/to/faq.txt");
        }
    }

    // 웹 소스
    println!(
        "[*] 웹 소스: {} 개 (워커 {}, 타임아웃 {}초)",
        config.sources.len(),
        config.fetch_workers,
        config.fetch_timeout.as_secs()
    );

    // 모델 서버
    match config.model.base_url {
        Some(ref url) => println!("[OK] 모델 서버: {} ({})", url, config.model.model),
        None => {
            println!("[!] 모델 서버: 미설정 (답변 합성 없이 동작)");
            println!("    설정: export AI_BASE_URL=http://localhost:8000");
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn local_item_count(doc: &Document) -> usize {
    dedup_items(GrammarParser::new().parse(doc)).len()
}

/// 질의가 분류되는 딥서치 유형
fn profile_name(query: &str) -> Option<&'static str> {
    classify(query).map(|p| p.name())
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("Apakah\nMyKad?", 20), "Apakah MyKad?");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "soalan-lazim",
            "--source",
            "https://www.jpn.gov.my/faq",
            "--workers",
            "0",
            "search",
            "mykad",
            "--limit",
            "3",
        ]);
        let config = cli.config();
        assert_eq!(config.sources, vec!["https://www.jpn.gov.my/faq"]);
        assert_eq!(config.fetch_workers, 1);
        assert!(matches!(cli.command, Commands::Search { limit: 3, .. }));
    }

    #[test]
    fn test_profile_name() {
        assert_eq!(profile_name("berapa kos cip ic rosak"), Some("ic_chip_cost"));
        assert_eq!(profile_name("waktu operasi"), None);
    }
}
