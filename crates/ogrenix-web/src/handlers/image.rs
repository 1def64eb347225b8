//! Standalone image generation for illustration prompts.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

pub async fn generate_image(
    State(state): State<SharedState>,
    Json(req): Json<ImageRequest>,
) -> Response {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        let body = serde_json::json!({ "error": "prompt must not be empty" });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let model = state.config.llm.image_model.clone();
    match state.llm.generate_image(&model, prompt).await {
        Ok(image) => {
            state.activity.record_stage("image", format!("image generated ({} chars)", image.len()));
            Json(serde_json::json!({ "image": image })).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, %model, "image generation failed");
            state.activity.record_error(err.to_string());
            let body = serde_json::json!({ "error": err.to_string() });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}
