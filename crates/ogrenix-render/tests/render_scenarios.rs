//! End-to-end pipeline scenarios: a buffer grows the way a model streams it,
//! and every snapshot must be a well-formed page.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ogrenix_render::chart::ChartEngine;
use ogrenix_render::error::ChartError;
use ogrenix_render::{ChartExecutor, RenderPipeline};

struct StaticEngine;

#[async_trait]
impl ChartEngine for StaticEngine {
    async fn render_png(&self, _code: &str) -> Result<Vec<u8>, ChartError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

struct CountingEngine {
    calls: AtomicUsize,
}

#[async_trait]
impl ChartEngine for CountingEngine {
    async fn render_png(&self, _code: &str) -> Result<Vec<u8>, ChartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

fn pipeline(engine: Arc<dyn ChartEngine>) -> RenderPipeline {
    RenderPipeline::new(Arc::new(ChartExecutor::new(engine)))
}

/// The chunks a model might emit for a short lesson, cut mid-fence on
/// purpose so intermediate snapshots land inside special blocks.
const LESSON_CHUNKS: &[&str] = &[
    "```md\n# Eğik Atış\n\nBir cismin yatayla açı yaparak",
    " fırlatılması.\n\n```mermaid\nflowchart TD\n",
    "A[Fırlatma] --> B[Yükselme]\nB --> C[Düşme]\n```\n\n",
    "Hızın bileşenleri:\n\n```python.matplotlib\n",
    "plt.plot([0, 1, 2], [0, 5, 0])\nplt.title('Yörünge')\n```\n\n",
    "Deneyin:\n\n```p5js\nfunction setup() { createCanvas(200, 100); }\n```\n\nSon.\n```",
];

#[tokio::test(flavor = "multi_thread")]
async fn test_no_snapshot_leaks_special_fence_syntax() {
    let pipeline = pipeline(Arc::new(StaticEngine));
    let mut buffer = String::new();

    for chunk in LESSON_CHUNKS {
        buffer.push_str(chunk);
        let doc = pipeline.render_snapshot(&buffer).await.unwrap();
        assert!(!doc.body_html.contains("```mermaid"), "at: {buffer:?}");
        assert!(!doc.body_html.contains("```python.matplotlib"));
        assert!(!doc.body_html.contains("```p5js"));
        assert!(doc.html.starts_with("<!DOCTYPE html>"));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mid_fence_snapshot_shows_placeholder() {
    let pipeline = pipeline(Arc::new(StaticEngine));
    // Buffer ends inside the mermaid block.
    let buffer: String = LESSON_CHUNKS[..2].concat();

    let doc = pipeline.render_snapshot(&buffer).await.unwrap();
    assert_eq!(doc.blocks.len(), 1);
    assert!(!doc.blocks[0].complete);
    assert!(doc.body_html.contains("data-pending=\"1\""));
    assert!(doc.body_html.contains("Eğik Atış"));
    assert!(!doc.body_html.contains("flowchart"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_final_document_renders_every_block_kind() {
    let pipeline = pipeline(Arc::new(StaticEngine));
    let buffer: String = LESSON_CHUNKS.concat();

    let doc = pipeline.render_snapshot(&buffer).await.unwrap();
    assert_eq!(doc.blocks.len(), 3);
    assert!(doc.blocks.iter().all(|b| b.complete && b.error.is_none()));

    // Fragments appear in document order.
    let diagram = doc.body_html.find("class=\"diagram-container\"").unwrap();
    let chart = doc.body_html.find("class=\"chart-container\"").unwrap();
    let sketch = doc.body_html.find("class=\"p5js-container\"").unwrap();
    assert!(diagram < chart && chart < sketch);

    assert!(doc.body_html.contains("data:image/png;base64,iVBORw=="));
    assert!(doc.body_html.contains("data-diagram-key"));
    assert!(doc.body_html.contains("function setup()"));
    assert!(doc.body_html.contains("<p>Son.</p>"));
    assert!(!doc.body_html.contains("data-pending"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_regrowing_buffer_never_reruns_finished_charts() {
    let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
    let pipeline = pipeline(engine.clone());
    let mut buffer = String::new();

    for chunk in LESSON_CHUNKS {
        buffer.push_str(chunk);
        pipeline.render_snapshot(&buffer).await.unwrap();
    }
    // The chart completes in one snapshot and is reused in every later one.
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_line_flowchart_is_broken_into_statements() {
    let pipeline = pipeline(Arc::new(StaticEngine));
    let md = "```mermaid\nflowchart TD A[Soru] --> B[Cevap] B --> C[Özet]\n```";

    let doc = pipeline.render_markdown(md).await.unwrap();
    assert!(doc.body_html.contains("flowchart TD\nA[Soru] --&gt; B[Cevap]"));
    assert!(doc.body_html.contains("\nB --&gt; C[Özet]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_buffer_renders_identically_across_pipelines() {
    let buffer: String = LESSON_CHUNKS.concat();

    let first = pipeline(Arc::new(StaticEngine))
        .render_snapshot(&buffer)
        .await
        .unwrap();
    let second = pipeline(Arc::new(StaticEngine))
        .render_snapshot(&buffer)
        .await
        .unwrap();
    assert_eq!(first.html, second.html);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_executor_idle_after_full_document() {
    let executor = Arc::new(ChartExecutor::new(Arc::new(StaticEngine)));
    let pipeline = RenderPipeline::new(executor.clone());

    let buffer: String = LESSON_CHUNKS.concat();
    pipeline.render_snapshot(&buffer).await.unwrap();
    assert!(executor.is_idle());
}
