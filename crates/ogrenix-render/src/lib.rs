//! ogrenix-render — streaming lesson-document rendering.
//!
//! Turns an accumulating markdown buffer (possibly cut off mid-fence) into a
//! self-contained HTML document: special fenced blocks (charts, diagrams,
//! sketches) become rendered fragments, everything else goes through a
//! standard markdown conversion, and the result is wrapped in a fixed page
//! template whose client runtimes initialize idempotently.

pub mod assemble;
pub mod chart;
pub mod diagram;
pub mod error;
pub mod fence;
pub mod fragment;
pub mod pipeline;
pub mod sketch;

pub use chart::{ChartEngine, ChartExecutor, PythonChartEngine};
pub use error::{ChartError, RenderError};
pub use fence::BlockKind;
pub use pipeline::{clean_outer_fence, BlockRecord, RenderPipeline, RenderedDocument};
