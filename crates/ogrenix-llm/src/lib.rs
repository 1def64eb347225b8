//! ogrenix-llm — model access for lesson generation.
//!
//! One backend trait with single-shot completion, token streaming and image
//! output, plus the OpenAI-compatible client used against OpenRouter or any
//! local `/v1` endpoint, and the prompt that asks the model for a lesson
//! document built from the renderer's special fences.

pub mod backend;
pub mod prompt;
pub mod sse;

pub use backend::{
    LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OpenAiCompatibleBackend, TokenStream,
};
pub use prompt::lesson_messages;
