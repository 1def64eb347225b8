//! Error types for the rendering pipeline.

use thiserror::Error;

/// Failure of one chart execution. Contained to the block that caused it:
/// the pipeline turns these into error fragments, never into a failed
/// snapshot.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart interpreter error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Execution(String),

    #[error("chart execution timed out after {0}s")]
    Timeout(u64),

    #[error("chart produced no image data")]
    EmptyOutput,

    #[error("chart executor is shut down")]
    Closed,
}

/// Failure of a whole snapshot render. While streaming these are logged and
/// the snapshot is skipped; on the final render they surface to the client.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page template error: {0}")]
    Template(#[from] minijinja::Error),
}
