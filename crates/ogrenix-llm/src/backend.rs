//! LLM backend trait and the OpenAI-compatible client.
//!
//! Backends:
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (OpenRouter,
//!                             LMStudio, vLLM, Ollama's /v1, …)
//!
//! The base URL is expected to include the version segment, e.g.
//! `https://openrouter.ai/api/v1` or `http://0.0.0.0:8000/v1`.

use std::pin::Pin;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::sse::SseLineDecoder;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Model {0} returned no decodable image payload")]
    NoImage(String),
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Incremental completion text, in arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Streams the completion as content deltas.
    async fn stream(&self, req: LlmRequest) -> Result<TokenStream, LlmError>;

    /// Generates one image with an image-capable model and returns the bare
    /// base64 payload.
    async fn generate_image(&self, _model: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unavailable(
            "image generation is not supported by this backend".to_string(),
        ))
    }

    fn model_id(&self) -> &str;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"].as_str().unwrap_or(fallback_model).to_string(),
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let message = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message });
    }
    Ok(body)
}

/// The payload of a `data:` SSE line. Comment lines (OpenRouter keep-alives
/// start with `:`) and other fields return None.
fn sse_data(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Image-capable chat models answer with base64 in the message content,
/// sometimes wrapped in a data URL or prose, sometimes folded across lines.
pub(crate) fn extract_base64_image(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let candidate = trimmed
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let compact: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() > 100 && BASE64.decode(&compact).is_ok() {
        return Some(compact);
    }

    let run = longest_base64_run(trimmed)?;
    if run.len() > 100 && BASE64.decode(run).is_ok() {
        return Some(run.to_string());
    }
    None
}

fn longest_base64_run(content: &str) -> Option<&str> {
    let bytes = content.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut start: Option<usize> = None;

    let mut keep = |from: usize, to: usize, best: &mut Option<(usize, usize)>| {
        if best.map_or(true, |(s, e)| to - from > e - s) {
            *best = Some((from, to));
        }
    };

    for (i, &b) in bytes.iter().enumerate() {
        let in_alphabet = b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=';
        match (in_alphabet, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                keep(s, i, &mut best);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        keep(s, bytes.len(), &mut best);
    }
    best.map(|(s, e)| &content[s..e])
}

// ── OpenAI-compatible client ──────────────────────────────────────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, req: &LlmRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": req.model.as_deref().unwrap_or(&self.model),
            "messages": req.messages,
        });
        if stream {
            body["stream"] = true.into();
        }
        // Absent knobs stay absent so the provider's own defaults apply.
        if let Some(max_tokens) = req.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        if let Some(temperature) = req.temperature {
            body["temperature"] = temperature.into();
        }
        body
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    #[instrument(skip(self, req), fields(model = %self.model, messages = req.messages.len()))]
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.request_body(&req, false);
        let resp = self
            .auth(self.client.post(self.completions_url()))
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    #[instrument(skip(self, req), fields(model = %self.model, messages = req.messages.len()))]
    async fn stream(&self, req: LlmRequest) -> Result<TokenStream, LlmError> {
        let body = self.request_body(&req, true);
        let resp = self
            .auth(self.client.post(self.completions_url()))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status >= 400 {
            // Failures arrive as a plain JSON body even on the streaming call.
            let body: serde_json::Value = resp.json().await?;
            let message = body["error"]["message"]
                .as_str()
                .or_else(|| body["message"].as_str())
                .unwrap_or("unknown API error")
                .to_string();
            return Err(LlmError::ApiError { status, message });
        }

        debug!("completion stream opened");
        let mut bytes = resp.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut decoder = SseLineDecoder::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                for line in decoder.push(&chunk) {
                    let Some(data) = sse_data(&line) else { continue };
                    if data == "[DONE]" {
                        break 'read;
                    }
                    let value: serde_json::Value = serde_json::from_str(data)?;
                    if let Some(token) = value["choices"][0]["delta"]["content"].as_str() {
                        if !token.is_empty() {
                            yield token.to_string();
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let resp = self
            .auth(self.client.post(self.completions_url()))
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("");
        extract_base64_image(content).ok_or_else(|| LlmError::NoImage(model.to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
