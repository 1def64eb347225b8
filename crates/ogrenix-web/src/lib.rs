//! ogrenix-web — HTTP surface of the lesson generator.
//! Serves:
//!   - The question form with a live lesson preview
//!   - POST /generate — SSE progression of one lesson document
//!   - The activity log page, its JSON feed and clearing
//!   - Image generation for illustration prompts
//!   - Health probe

pub mod activity;
pub mod handlers;
pub mod router;
pub mod state;
pub mod stream;
