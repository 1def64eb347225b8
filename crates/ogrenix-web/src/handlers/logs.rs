//! Activity log page and JSON feed.

use axum::extract::State;
use axum::response::Html;
use axum::Json;

use crate::activity::ActivityEntry;
use crate::state::SharedState;

pub async fn logs_page() -> Html<&'static str> {
    Html(include_str!("../../templates/logs.html"))
}

pub async fn logs_json(State(state): State<SharedState>) -> Json<Vec<ActivityEntry>> {
    Json(state.activity.recent(200))
}

pub async fn logs_clear(State(state): State<SharedState>) -> Json<serde_json::Value> {
    state.activity.clear();
    Json(serde_json::json!({ "status": "cleared" }))
}
