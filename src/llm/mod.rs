//! 생성 모델 클라이언트 - OpenAI 호환 서버 (vLLM / Ollama)
//!
//! 두 가지 와이어 프로토콜을 지원합니다:
//! - Chat: `POST {base}/v1/chat/completions` (메시지 목록, Bearer 인증)
//! - Completion: `POST {base}/api/generate` (단일 프롬프트, `stream=false`)
//!
//! ## 사용법
//! ```rust,ignore
//! let client = OpenAiCompatClient::from_config(&config.model)?;
//! let text = client.complete("Hello", &CompletionOptions::default()).await?;
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::ModelError;

/// 오류 본문을 로그/에러에 담을 때의 최대 길이
const MAX_ERROR_BODY_CHARS: usize = 300;

// ============================================================================
// GenerativeModelClient Trait
// ============================================================================

/// 와이어 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProtocol {
    /// 채팅 메시지 목록
    Chat,
    /// 단일 프롬프트 완성
    Completion,
}

/// 생성 옵션
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub protocol: WireProtocol,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 800,
            protocol: WireProtocol::Chat,
        }
    }
}

impl CompletionOptions {
    pub fn with_protocol(mut self, protocol: WireProtocol) -> Self {
        self.protocol = protocol;
        self
    }
}

/// 생성 모델 트레이트
#[async_trait]
pub trait GenerativeModelClient: Send + Sync {
    /// 프롬프트 완성
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, ModelError>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI-compatible client
// ============================================================================

/// Chat 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat 응답
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Completion 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Completion 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// OpenAI 호환 생성 모델 클라이언트
#[derive(Debug)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatClient {
    /// 모델 설정에서 생성 (`AI_BASE_URL`이 없으면 에러)
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(ModelError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    async fn chat(&self, prompt: &str, options: &CompletionOptions) -> Result<String, ModelError> {
        let url = self.chat_url();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::info!("Sending chat request to {} with model {}", url, self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let body = read_success_body(response).await?;
        parse_chat_response(&body)
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = self.generate_url();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::info!("Sending completion request to {}", url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let body = read_success_body(response).await?;
        parse_generate_response(&body)
    }
}

/// 성공 상태가 아니면 `ModelError::Status`
async fn read_success_body(response: reqwest::Response) -> Result<String, ModelError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ModelError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ModelError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    Ok(body)
}

fn parse_chat_response(body: &str) -> Result<String, ModelError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Payload(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ModelError::Payload("no message content in choices".to_string()))
}

fn parse_generate_response(body: &str) -> Result<String, ModelError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Payload(e.to_string()))?;

    parsed
        .response
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ModelError::Payload("missing `response` field".to_string()))
}

#[async_trait]
impl GenerativeModelClient for OpenAiCompatClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, ModelError> {
        let result = match options.protocol {
            WireProtocol::Chat => self.chat(prompt, options).await,
            WireProtocol::Completion => self.generate(prompt).await,
        };

        if result.is_ok() {
            tracing::info!("Model {} returned response ({:?})", self.model, options.protocol);
        }
        result
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
