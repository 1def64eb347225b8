//! p5.js sketch fragments.
//!
//! Sketch source passes through verbatim. It lands in an inert script
//! element the page's initializer executes per container (global-mode
//! sketches are shimmed into p5 instances there), plus the usual
//! disclosure. Ids derive from content like every other fragment.

use crate::fragment::{disclosure, short_hash};

pub fn render_sketch(body: &str) -> String {
    let source = body.trim();
    let id = format!("p5js_{}", short_hash(body));
    let details = disclosure("javascript", source);
    format!(
        r#"<div class="p5js-container" id="{id}">
    <div class="p5js">
        <div class="p5js-canvas" id="canvas_{id}"></div>
        <script type="text/plain" class="p5js-sketch">{source}</script>
    </div>
{details}
</div>"#
    )
}
