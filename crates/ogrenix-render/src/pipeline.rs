//! Incremental document pipeline.
//!
//! [`RenderPipeline`] turns a raw model buffer into a complete lesson page:
//! it cleans the outer fence, scans for special blocks, renders each block
//! to an HTML fragment (with a per-document cache keyed by content), and
//! substitutes the fragments into the converted markdown. The same pipeline
//! serves both mid-stream snapshots and the final document, so re-rendering
//! a grown buffer never repeats chart executions for unchanged blocks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::assemble::{markdown_to_html, wrap_page};
use crate::chart::{chart_error_fragment, chart_fragment, clean_chart_code, ChartExecutor};
use crate::diagram::render_diagram;
use crate::error::RenderError;
use crate::fence::{block_marker, scan, BlockKind};
use crate::fragment::{content_hash, pending_placeholder};
use crate::sketch::render_sketch;

/// Strips the outer ```` ```md ```` / ```` ```markdown ```` fence models tend
/// to wrap their whole answer in. Inner fences are left alone.
pub fn clean_outer_fence(raw: &str) -> String {
    let mut text = raw.trim();
    for tag in ["```markdown", "```md"] {
        if let Some(rest) = text.strip_prefix(tag) {
            if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
                text = rest;
                break;
            }
        }
    }
    let trimmed = text.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

/// What happened to one special block during a render pass.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub kind: BlockKind,
    pub content_hash: String,
    pub complete: bool,
    /// Render failure message, if the block produced an error fragment.
    pub error: Option<String>,
    /// True when the fragment came from the pipeline cache.
    pub cached: bool,
}

/// A fully assembled document together with per-block outcomes.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// The self-contained lesson page.
    pub html: String,
    /// The converted body without the page shell, useful for previews.
    pub body_html: String,
    pub blocks: Vec<BlockRecord>,
}

#[derive(Clone)]
struct CachedFragment {
    html: String,
    error: Option<String>,
}

/// Renders snapshots of one generated document.
///
/// The fragment cache lives for the lifetime of the pipeline, which the
/// server scopes to a single generation request.
pub struct RenderPipeline {
    executor: Arc<ChartExecutor>,
    cache: Mutex<HashMap<(BlockKind, String), CachedFragment>>,
}

impl RenderPipeline {
    pub fn new(executor: Arc<ChartExecutor>) -> Self {
        Self {
            executor,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Renders a raw model buffer, outer fence included, into a full page.
    pub async fn render_snapshot(&self, raw: &str) -> Result<RenderedDocument, RenderError> {
        let cleaned = clean_outer_fence(raw);
        self.render_markdown(&cleaned).await
    }

    /// Renders already-cleaned markdown into a full page.
    pub async fn render_markdown(&self, markdown: &str) -> Result<RenderedDocument, RenderError> {
        let scanned = scan(markdown);
        tracing::debug!(blocks = scanned.blocks.len(), "rendering document snapshot");

        let mut fragments = Vec::with_capacity(scanned.blocks.len());
        let mut records = Vec::with_capacity(scanned.blocks.len());

        for block in &scanned.blocks {
            if !block.complete {
                fragments.push(pending_placeholder(block.kind).to_string());
                records.push(BlockRecord {
                    kind: block.kind,
                    content_hash: content_hash(&block.body),
                    complete: false,
                    error: None,
                    cached: false,
                });
                continue;
            }

            let hash = content_hash(&block.body);
            let key = (block.kind, hash.clone());

            let hit = { self.cache.lock().await.get(&key).cloned() };
            let (fragment, error, cached) = match hit {
                Some(entry) => (entry.html, entry.error, true),
                None => {
                    let (html, error) = self.render_block(block.kind, &block.body).await;
                    self.cache.lock().await.insert(
                        key,
                        CachedFragment {
                            html: html.clone(),
                            error: error.clone(),
                        },
                    );
                    (html, error, false)
                }
            };

            fragments.push(fragment);
            records.push(BlockRecord {
                kind: block.kind,
                content_hash: hash,
                complete: true,
                error,
                cached,
            });
        }

        let mut body_html = markdown_to_html(&scanned.marked);
        for (index, fragment) in fragments.iter().enumerate() {
            body_html = body_html.replace(&block_marker(index), fragment);
        }

        let html = wrap_page(&body_html)?;
        Ok(RenderedDocument {
            html,
            body_html,
            blocks: records,
        })
    }

    async fn render_block(&self, kind: BlockKind, body: &str) -> (String, Option<String>) {
        match kind {
            BlockKind::Chart => {
                let code = clean_chart_code(body);
                match self.executor.execute(&code).await {
                    Ok(png) => (chart_fragment(body, &png), None),
                    Err(err) => {
                        tracing::warn!(error = %err, "chart execution failed");
                        (chart_error_fragment(body, &err), Some(err.to_string()))
                    }
                }
            }
            BlockKind::Diagram => (render_diagram(body), None),
            BlockKind::Sketch => (render_sketch(body), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::chart::ChartEngine;
    use crate::error::ChartError;

    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChartEngine for CountingEngine {
        async fn render_png(&self, _code: &str) -> Result<Vec<u8>, ChartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![137, 80, 78, 71])
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl ChartEngine for FailingEngine {
        async fn render_png(&self, _code: &str) -> Result<Vec<u8>, ChartError> {
            Err(ChartError::Execution("NameError: name 'pl' is not defined".into()))
        }
    }

    fn pipeline_with(engine: impl ChartEngine + 'static) -> RenderPipeline {
        RenderPipeline::new(Arc::new(ChartExecutor::new(Arc::new(engine))))
    }

    #[test]
    fn test_clean_outer_fence_strips_md_wrapper() {
        let raw = "```md\n# Sarkaç\n\nMetin.\n```";
        assert_eq!(clean_outer_fence(raw), "# Sarkaç\n\nMetin.");
    }

    #[test]
    fn test_clean_outer_fence_strips_markdown_wrapper() {
        let raw = "  ```markdown\nSatır\n```  \n";
        assert_eq!(clean_outer_fence(raw), "Satır");
    }

    #[test]
    fn test_clean_outer_fence_keeps_inner_fences() {
        let raw = "```md\nÖnce\n\n```python\nx = 1\n```\n```";
        let cleaned = clean_outer_fence(raw);
        assert!(cleaned.starts_with("Önce"));
        assert!(cleaned.contains("```python\nx = 1\n```"));
    }

    #[test]
    fn test_clean_outer_fence_passthrough() {
        assert_eq!(clean_outer_fence("# Başlık\n\nDüz metin."), "# Başlık\n\nDüz metin.");
        assert_eq!(clean_outer_fence(""), "");
    }

    #[tokio::test]
    async fn test_markers_are_replaced_by_fragments() {
        let pipeline = pipeline_with(CountingEngine::new());
        let md = "Giriş.\n\n```mermaid\ngraph TD\nA --> B\n```\n\nSon.";
        let doc = pipeline.render_markdown(md).await.unwrap();
        assert!(!doc.body_html.contains("ogx-block"));
        assert!(doc.body_html.contains("class=\"mermaid\""));
        assert!(doc.body_html.contains("<p>Giriş.</p>"));
        assert!(doc.body_html.contains("<p>Son.</p>"));
        assert!(doc.html.contains("mermaid.min.js"));
    }

    #[tokio::test]
    async fn test_identical_charts_execute_once() {
        let chart = "```python.matplotlib\nplt.plot([1, 2])\n```";
        let md = format!("{chart}\n\nAra metin.\n\n{chart}");
        let pipeline = pipeline_with(CountingEngine::new());

        let doc = pipeline.render_markdown(&md).await.unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert!(!doc.blocks[0].cached);
        assert!(doc.blocks[1].cached);

        // A later snapshot of the grown buffer reuses the same fragments.
        let again = pipeline.render_markdown(&md).await.unwrap();
        assert!(again.blocks.iter().all(|b| b.cached));
    }

    #[tokio::test]
    async fn test_incomplete_block_becomes_placeholder() {
        let pipeline = pipeline_with(CountingEngine::new());
        let md = "Konu.\n\n```mermaid\ngraph TD\nA --> B";
        let doc = pipeline.render_markdown(md).await.unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert!(!doc.blocks[0].complete);
        assert!(doc.body_html.contains("data-pending=\"1\""));
        assert!(!doc.body_html.contains("```"));
    }

    #[tokio::test]
    async fn test_chart_failure_is_contained() {
        let pipeline = pipeline_with(FailingEngine);
        let md = "Önce.\n\n```python.matplotlib\npl.plot([1])\n```\n\nSonra.";
        let doc = pipeline.render_markdown(md).await.unwrap();
        assert!(doc.body_html.contains("Grafik Hatası"));
        assert!(doc.body_html.contains("<p>Önce.</p>"));
        assert!(doc.body_html.contains("<p>Sonra.</p>"));
        assert_eq!(
            doc.blocks[0].error.as_deref(),
            Some("NameError: name 'pl' is not defined")
        );
    }

    #[tokio::test]
    async fn test_failed_charts_are_cached_too() {
        struct FailCounting {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl ChartEngine for FailCounting {
            async fn render_png(&self, _code: &str) -> Result<Vec<u8>, ChartError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(ChartError::EmptyOutput)
            }
        }

        let engine = Arc::new(FailCounting {
            calls: AtomicUsize::new(0),
        });
        let pipeline = RenderPipeline::new(Arc::new(ChartExecutor::new(engine.clone())));

        let md = "```python.matplotlib\nplt.plot([1])\n```";
        pipeline.render_markdown(md).await.unwrap();
        pipeline.render_markdown(md).await.unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_cleans_outer_fence() {
        let pipeline = pipeline_with(CountingEngine::new());
        let doc = pipeline.render_snapshot("```md\n# Başlık\n```").await.unwrap();
        assert!(doc.body_html.contains("<h1>Başlık</h1>"));
        assert!(!doc.body_html.contains("```"));
    }
}
