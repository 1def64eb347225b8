//! Health probe.

use axum::extract::State;
use axum::Json;

use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.llm.model_id(),
        "chart_executor_idle": state.executor.is_idle(),
        "open_figures": state.executor.open_figures(),
    }))
}
