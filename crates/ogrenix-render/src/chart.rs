//! Chart block rendering: code cleanup, isolated execution, fragments.
//!
//! Chart code is executed by a [`ChartEngine`]. The default engine spawns a
//! short-lived interpreter per chart running the embedded driver script, so
//! figure state cannot leak between executions. Figure state is still a
//! process-wide resource from the renderer's point of view, so the
//! [`ChartExecutor`] serializes executions behind a single-permit gate.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::ChartError;
use crate::fragment::{disclosure, escape_html, short_hash};

/// Driver script shipped into the interpreter with `-c`.
const CHART_DRIVER: &str = include_str!("chart_driver.py");

// ── 1. Engine seam ───────────────────────────────────────────────────────

/// Executes chart code and produces PNG bytes.
#[async_trait]
pub trait ChartEngine: Send + Sync {
    async fn render_png(&self, code: &str) -> Result<Vec<u8>, ChartError>;

    /// Figures the engine still holds open after its last execution.
    /// Zero for the subprocess engine by construction.
    fn open_figures(&self) -> usize {
        0
    }
}

/// Subprocess engine: one interpreter invocation per chart.
pub struct PythonChartEngine {
    python_bin: String,
    timeout: Duration,
}

impl PythonChartEngine {
    pub fn new(python_bin: impl Into<String>, timeout: Duration) -> Self {
        Self { python_bin: python_bin.into(), timeout }
    }
}

#[async_trait]
impl ChartEngine for PythonChartEngine {
    async fn render_png(&self, code: &str) -> Result<Vec<u8>, ChartError> {
        let mut child = Command::new(&self.python_bin)
            .arg("-c")
            .arg(CHART_DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes()).await?;
            // Closing stdin lets the driver's read return.
            drop(stdin);
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            // Dropping the timed-out future kills the child (kill_on_drop).
            Err(_) => return Err(ChartError::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChartError::Execution(last_stderr_line(&stderr)));
        }
        if output.stdout.is_empty() {
            return Err(ChartError::EmptyOutput);
        }
        debug!(bytes = output.stdout.len(), "chart rendered");
        Ok(output.stdout)
    }
}

/// The last non-empty stderr line is the exception message in an interpreter
/// traceback; the full trace stays out of user-facing fragments.
fn last_stderr_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("chart execution failed")
        .trim()
        .to_string()
}

// ── 2. Process-wide execution gate ───────────────────────────────────────

/// Serializes chart executions: at most one runs at a time, and the gate is
/// released on success and failure alike.
pub struct ChartExecutor {
    engine: Arc<dyn ChartEngine>,
    gate: Semaphore,
}

impl ChartExecutor {
    pub fn new(engine: Arc<dyn ChartEngine>) -> Self {
        Self { engine, gate: Semaphore::new(1) }
    }

    pub async fn execute(&self, code: &str) -> Result<Vec<u8>, ChartError> {
        let _permit = self.gate.acquire().await.map_err(|_| ChartError::Closed)?;
        self.engine.render_png(code).await
        // permit drops here on every path
    }

    /// True when no execution currently holds the gate.
    pub fn is_idle(&self) -> bool {
        self.gate.available_permits() == 1
    }

    /// Figures the engine still holds open. Must be zero between executions.
    pub fn open_figures(&self) -> usize {
        self.engine.open_figures()
    }
}

// ── 3. Code cleanup ──────────────────────────────────────────────────────

/// Prepare LLM-produced chart code for non-interactive execution: drop
/// blocking display calls, fold multi-line title string literals into one
/// line, and strip title text down to a printable whitelist.
pub fn clean_chart_code(code: &str) -> String {
    let code = show_call_re().replace_all(code, "").into_owned();
    let code = fold_title_strings(&code);
    clean_title_literals(&code)
}

fn show_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"plt\.show\(\s*\)").expect("valid regex"))
}

fn single_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w*\.?(?:title|set_title))\('([^']*)'").expect("valid regex"))
}

fn double_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w*\.?(?:title|set_title))\("([^"]*)""#).expect("valid regex"))
}

fn newline_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("valid regex"))
}

fn title_charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^\w\s()\[\]{}+*/=.,:;|^$\\°'\-]+").expect("valid regex")
    })
}

/// A title string literal opened on one line and closed on a later one
/// breaks the interpreter. Join such runs into a single physical line with
/// literal `\n` escapes, the multi-line variant the interpreter accepts.
fn fold_title_strings(code: &str) -> String {
    let mut fixed: Vec<String> = Vec::new();
    let mut pending: Option<(String, char)> = None;

    for line in code.split('\n') {
        match pending.take() {
            None => {
                if line.contains("title(") || line.contains("set_title(") {
                    if count_unescaped(line, '\'') % 2 == 1 {
                        pending = Some((line.to_string(), '\''));
                        continue;
                    }
                    if count_unescaped(line, '"') % 2 == 1 {
                        pending = Some((line.to_string(), '"'));
                        continue;
                    }
                }
                fixed.push(line.to_string());
            }
            Some((mut joined, quote)) => {
                joined.push_str("\\n");
                joined.push_str(line);
                let escaped_close = format!("\\{quote}");
                if line.contains(quote) && !line.ends_with(&escaped_close) {
                    fixed.push(joined);
                } else {
                    pending = Some((joined, quote));
                }
            }
        }
    }
    if let Some((joined, _)) = pending {
        fixed.push(joined);
    }
    fixed.join("\n")
}

fn count_unescaped(line: &str, quote: char) -> usize {
    let total = line.matches(quote).count();
    let escaped = line.matches(&format!("\\{quote}")).count();
    total.saturating_sub(escaped)
}

fn clean_title_literals(code: &str) -> String {
    let code = single_title_re().replace_all(code, |caps: &regex::Captures<'_>| {
        format!("{}('{}'", &caps[1], clean_title_text(&caps[2]))
    });
    double_title_re()
        .replace_all(&code, |caps: &regex::Captures<'_>| {
            format!("{}(\"{}\"", &caps[1], clean_title_text(&caps[2]))
        })
        .into_owned()
}

/// Word characters stay (including Turkish letters); emoji and control
/// characters that crash font rendering go.
fn clean_title_text(text: &str) -> String {
    let spaced = newline_run_re().replace_all(text, " ");
    title_charset_re().replace_all(&spaced, "").trim().to_string()
}

// ── 4. Fragments ─────────────────────────────────────────────────────────

pub fn chart_fragment(body: &str, png: &[u8]) -> String {
    let encoded = BASE64.encode(png);
    let id = format!("chart_{}", short_hash(body));
    let details = disclosure("python", body);
    format!(
        r#"<div class="chart-container" id="{id}">
    <img src="data:image/png;base64,{encoded}" alt="Grafik" class="chart-image"/>
{details}
</div>"#
    )
}

pub fn chart_error_fragment(body: &str, error: &ChartError) -> String {
    format!(
        r#"<div class="error-box">
    <div class="error-title">Grafik Hatası</div>
    <div class="error-message">{message}</div>
    <details class="code-toggle">
        <summary>Kod</summary>
        <pre class="code-block"><code class="language-python">{source}</code></pre>
    </details>
</div>"#,
        message = escape_html(&error.to_string()),
        source = escape_html(body),
    )
}
