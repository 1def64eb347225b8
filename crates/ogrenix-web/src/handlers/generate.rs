//! Lesson generation: SSE streaming and single-shot variants.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_stream::StreamExt;

use ogrenix_llm::{lesson_messages, LlmRequest};
use ogrenix_render::{clean_outer_fence, RenderPipeline};

use crate::state::SharedState;
use crate::stream::generation_stream;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub question: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

pub async fn generate(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let question = req.question.trim().to_string();
    if question.is_empty() {
        let body = serde_json::json!({ "error": "question must not be empty" });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    tracing::info!(%question, stream = req.stream, "generation requested");
    if req.stream {
        let events = generation_stream(state, question).filter_map(|event| {
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok::<_, Infallible>(Event::default().data(data)))
        });
        Sse::new(events)
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
            .into_response()
    } else {
        match generate_once(&state, &question).await {
            Ok(html) => Json(serde_json::json!({ "html": html })).into_response(),
            Err(error) => {
                state.activity.record_error(error.clone());
                let body = serde_json::json!({ "error": error });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

/// Non-streaming path: one completion, one render, one page.
async fn generate_once(state: &SharedState, question: &str) -> Result<String, String> {
    state.activity.record_stage("start", format!("generation started: {question}"));
    let request = LlmRequest {
        messages: lesson_messages(question),
        model: None,
        max_tokens: state.config.llm.max_tokens,
        temperature: state.config.llm.temperature,
    };
    let response = state.llm.complete(request).await.map_err(|err| err.to_string())?;

    let markdown = clean_outer_fence(&response.content);
    if markdown.is_empty() {
        return Err("model returned no content".to_string());
    }

    let pipeline = RenderPipeline::new(state.executor.clone());
    let document = pipeline
        .render_markdown(&markdown)
        .await
        .map_err(|err| err.to_string())?;
    state.activity.record_blocks(&document.blocks);
    state.activity.record_stage(
        "complete",
        format!("lesson rendered: {} blocks, {} bytes", document.blocks.len(), document.html.len()),
    );
    Ok(document.html)
}
