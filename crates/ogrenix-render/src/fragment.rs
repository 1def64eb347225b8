//! Shared fragment plumbing: content hashing, HTML escaping and the fixed
//! pending placeholders shown while a block is still streaming in.

use sha2::{Digest, Sha256};

use crate::fence::BlockKind;

/// Full SHA-256 hex of a block body. Dedup cache key material.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short hash for element ids. Derived from content so the same block
/// always renders with the same identity.
pub fn short_hash(body: &str) -> String {
    let mut hash = content_hash(body);
    hash.truncate(8);
    hash
}

/// Stable key attribute value for diagram containers, long enough to make
/// accidental collisions a non-concern.
pub fn stable_key(body: &str) -> String {
    let mut hash = content_hash(body);
    hash.truncate(16);
    hash
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Collapsible source disclosure attached to every rendered fragment.
pub(crate) fn disclosure(language: &str, source: &str) -> String {
    format!(
        r#"    <details class="code-toggle">
        <summary>Kodu Göster</summary>
        <pre class="code-block"><code class="language-{language}">{source}</code></pre>
    </details>"#,
        language = language,
        source = escape_html(source),
    )
}

const PENDING_DIAGRAM: &str = r#"<div class="diagram-container">
    <div class="mermaid" data-pending="1"></div>
    <details class="code-toggle">
        <summary>Kodu Göster</summary>
        <pre class="code-block"><code class="language-mermaid"></code></pre>
    </details>
</div>"#;

const PENDING_SKETCH: &str = r#"<div class="p5js-container">
    <div class="p5js" data-pending="1">
        <div class="p5js-canvas"></div>
    </div>
    <details class="code-toggle">
        <summary>Kodu Göster</summary>
        <pre class="code-block"><code class="language-javascript"></code></pre>
    </details>
</div>"#;

const PENDING_CHART: &str = r#"<div class="chart-container" data-pending="1">
    <!-- Grafik hazırlanıyor... -->
</div>"#;

/// Fixed placeholder for an incomplete block. Contains no partial source.
pub fn pending_placeholder(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Chart => PENDING_CHART,
        BlockKind::Diagram => PENDING_DIAGRAM,
        BlockKind::Sketch => PENDING_SKETCH,
    }
}
