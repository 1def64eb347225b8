//! Shared fakes for the web integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;

use ogrenix_config::Config;
use ogrenix_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse, TokenStream};
use ogrenix_web::state::AppState;

/// A short lesson the way a model streams it, outer fence included.
pub const LESSON_CHUNKS: &[&str] = &[
    "```md\n",
    "# Eğik Atış\n\n",
    "Yatayla açı yaparak fırlatma.\n\n",
    "```mermaid\nflowchart TD\nA[Soru] --> B[Cevap]\n```\n\n",
    "Son söz.\n",
    "```",
];

/// Replays a fixed chunk script instead of calling a real endpoint.
pub struct ScriptedBackend {
    pub chunks: Vec<&'static str>,
}

impl ScriptedBackend {
    pub fn lesson() -> Self {
        Self { chunks: LESSON_CHUNKS.to_vec() }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            content: self.chunks.concat(),
            model: "scripted".to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }

    async fn stream(&self, _req: LlmRequest) -> Result<TokenStream, LlmError> {
        let tokens: Vec<Result<String, LlmError>> =
            self.chunks.iter().map(|chunk| Ok(chunk.to_string())).collect();
        Ok(Box::pin(tokio_stream::iter(tokens)))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Opens a stream that never yields a token. For deadline tests.
pub struct StalledBackend;

#[async_trait]
impl LlmBackend for StalledBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Unavailable("stalled".to_string()))
    }

    async fn stream(&self, _req: LlmRequest) -> Result<TokenStream, LlmError> {
        Ok(Box::pin(tokio_stream::pending()))
    }

    fn model_id(&self) -> &str {
        "stalled"
    }
}

/// Fails single-shot completions outright and breaks mid-stream.
pub struct BrokenBackend;

#[async_trait]
impl LlmBackend for BrokenBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Unavailable("scripted failure".to_string()))
    }

    async fn stream(&self, _req: LlmRequest) -> Result<TokenStream, LlmError> {
        let tokens: Vec<Result<String, LlmError>> = vec![
            Ok("```md\n".to_string()),
            Ok("# Başlık\n".to_string()),
            Err(LlmError::Unavailable("connection reset".to_string())),
        ];
        Ok(Box::pin(tokio_stream::iter(tokens)))
    }

    fn model_id(&self) -> &str {
        "broken"
    }
}

/// App state around a fake backend. The scripted lessons carry no chart
/// blocks, so the Python engine is never spawned.
pub fn test_app_state(llm: Arc<dyn LlmBackend>, snapshot_interval_ms: u64) -> AppState {
    let mut config = Config::default();
    config.generation.snapshot_interval_ms = snapshot_interval_ms;
    AppState::with_backend(config, llm)
}
