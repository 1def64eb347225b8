//! The generation loop: one LLM stream in, one event stream out.
//!
//! Every request walks the same states: a single `start`, interleaved
//! `chunk` and `content` events while tokens arrive, then exactly one of
//! `complete` or `error`, and a final `end` that is always last. Snapshot
//! renders are throttled and best-effort; only the final render may fail
//! the generation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use ogrenix_llm::{lesson_messages, LlmRequest};
use ogrenix_render::{clean_outer_fence, RenderPipeline};

use crate::state::SharedState;

/// Wire events pushed to the client during one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Generation accepted; always the first event.
    Start { message: String },
    /// One raw model token, in arrival order.
    Chunk { chunk: String },
    /// A full lesson page snapshot of the buffer so far.
    Content { html: String },
    /// The final lesson page and its cleaned markdown source.
    Complete { html: String, markdown: String },
    /// Generation failed; takes the place of `complete`.
    Error { error: String },
    /// Always the last event of the stream.
    End,
}

enum Abort {
    /// Receiver dropped; the client went away.
    ClientGone,
    Failed(String),
}

/// Spawns one generation and returns its event stream. Dropping the stream
/// cancels the generation at the next event send.
pub fn generation_stream(state: SharedState, question: String) -> ReceiverStream<GenerationEvent> {
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(drive_generation(state, question, tx));
    ReceiverStream::new(rx)
}

async fn drive_generation(
    state: SharedState,
    question: String,
    tx: mpsc::Sender<GenerationEvent>,
) {
    match run_generation(&state, &question, &tx).await {
        Ok(()) => {}
        Err(Abort::ClientGone) => {
            tracing::debug!("client disconnected mid-generation");
            return;
        }
        Err(Abort::Failed(error)) => {
            tracing::error!(%error, "generation failed");
            state.activity.record_error(error.clone());
            let _ = tx.send(GenerationEvent::Error { error }).await;
        }
    }
    let _ = tx.send(GenerationEvent::End).await;
}

async fn send(tx: &mpsc::Sender<GenerationEvent>, event: GenerationEvent) -> Result<(), Abort> {
    tx.send(event).await.map_err(|_| Abort::ClientGone)
}

async fn run_generation(
    state: &SharedState,
    question: &str,
    tx: &mpsc::Sender<GenerationEvent>,
) -> Result<(), Abort> {
    state.activity.record_stage("start", format!("generation started: {question}"));
    send(tx, GenerationEvent::Start { message: "Ders hazırlanıyor".to_string() }).await?;

    let request = LlmRequest {
        messages: lesson_messages(question),
        model: None,
        max_tokens: state.config.llm.max_tokens,
        temperature: state.config.llm.temperature,
    };
    let mut tokens = state
        .llm
        .stream(request)
        .await
        .map_err(|err| Abort::Failed(err.to_string()))?;

    let pipeline = RenderPipeline::new(state.executor.clone());
    let snapshot_interval = Duration::from_millis(state.config.generation.snapshot_interval_ms);
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(state.config.generation.max_stream_secs);
    let mut last_snapshot = tokio::time::Instant::now();
    let mut buffer = String::new();

    loop {
        let next = tokio::time::timeout_at(deadline, tokens.next())
            .await
            .map_err(|_| {
                Abort::Failed(format!(
                    "generation exceeded {} seconds",
                    state.config.generation.max_stream_secs
                ))
            })?;
        let Some(token) = next else { break };
        let token = token.map_err(|err| Abort::Failed(err.to_string()))?;

        buffer.push_str(&token);
        send(tx, GenerationEvent::Chunk { chunk: token }).await?;

        if last_snapshot.elapsed() >= snapshot_interval {
            match pipeline.render_snapshot(&buffer).await {
                Ok(document) => {
                    state.activity.record_blocks(&document.blocks);
                    send(tx, GenerationEvent::Content { html: document.html }).await?;
                }
                // Snapshots are best-effort; the final render decides.
                Err(err) => tracing::warn!(error = %err, "snapshot render failed"),
            }
            last_snapshot = tokio::time::Instant::now();
        }
    }

    let markdown = clean_outer_fence(&buffer);
    if markdown.is_empty() {
        return Err(Abort::Failed("model returned no content".to_string()));
    }

    let document = pipeline
        .render_markdown(&markdown)
        .await
        .map_err(|err| Abort::Failed(err.to_string()))?;
    state.activity.record_blocks(&document.blocks);
    state.activity.record_stage(
        "complete",
        format!("lesson rendered: {} blocks, {} bytes", document.blocks.len(), document.html.len()),
    );
    send(tx, GenerationEvent::Complete { html: document.html, markdown }).await?;
    Ok(())
}
