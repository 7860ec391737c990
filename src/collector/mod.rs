//! 코퍼스 파일 로더
//!
//! 로컬 FAQ 코퍼스(주석이 달린 평문)를 읽습니다. 경로가 디렉토리이면
//! 하위의 `.txt`/`.md` 파일을 경로 순으로 이어 붙이고, 파일마다 섹션
//! 표시를 넣어 문법 파서가 파일 단위 제목을 보도록 합니다.
//! .gitignore 패턴과 숨김 파일 규칙을 존중합니다.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::LoadError;

/// 코퍼스로 인정하는 확장자
const CORPUS_EXTENSIONS: &[&str] = &["txt", "md"];

/// 코퍼스 파일 로더
pub struct CorpusFile;

impl CorpusFile {
    /// 파일 또는 디렉토리에서 코퍼스 텍스트 로드
    pub fn load(path: &Path) -> Result<String, LoadError> {
        if path.is_dir() {
            Self::load_directory(path)
        } else {
            Self::load_file(path)
        }
    }

    /// 단일 파일 로드 (UTF-8이 아닌 바이트는 대체 문자로)
    pub fn load_file(path: &Path) -> Result<String, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| LoadError {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!("Loaded corpus file {:?} ({} bytes)", path, bytes.len());
        Ok(text)
    }

    /// 디렉토리 재귀 로드
    pub fn load_directory(dir: &Path) -> Result<String, LoadError> {
        let files = Self::corpus_files(dir)?;
        if files.is_empty() {
            return Err(LoadError {
                path: dir.to_path_buf(),
                cause: "no .txt or .md files found".to_string(),
            });
        }

        let mut corpus = String::new();
        for file in &files {
            let text = match Self::load_file(file) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("{}", e);
                    continue;
                }
            };

            let title = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_uppercase())
                .unwrap_or_default();

            // 파일 자체에 섹션 표시가 없으면 파일명을 제목으로
            if !text.trim_start().starts_with("## ") {
                corpus.push_str(&format!("## {}\n", title));
            }
            corpus.push_str(&text);
            if !text.ends_with('\n') {
                corpus.push('\n');
            }
        }

        tracing::info!("Loaded {} corpus files from {:?}", files.len(), dir);
        Ok(corpus)
    }

    /// 디렉토리 안의 코퍼스 파일 목록 (경로 정렬)
    pub fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError {
                path: dir.to_path_buf(),
                cause: "not a directory".to_string(),
            });
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(dir)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            if is_corpus_file(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CORPUS_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
