//! Fence scanning over the streaming markdown buffer.
//!
//! The buffer may end at any byte, including in the middle of a special
//! fenced block. The scanner walks the buffer once, left to right, cutting
//! out every special block it finds and leaving a single-line HTML-comment
//! marker in its place. Markers survive markdown conversion untouched, so
//! rendered fragments can be substituted into the final HTML afterwards and
//! raw special-fence syntax never reaches the markdown converter.
//!
//! An unterminated special fence makes everything after its start token
//! unparseable, so the scan replaces that tail with a single incomplete
//! block and stops.

use std::fmt;

/// The three special fence kinds the renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// ```python.matplotlib — executed server-side into a PNG.
    Chart,
    /// ```mermaid — normalized and rendered client-side.
    Diagram,
    /// ```p5js — wrapped verbatim for client-side execution.
    Sketch,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [BlockKind::Chart, BlockKind::Diagram, BlockKind::Sketch];

    /// The language tag that opens a fence of this kind.
    pub fn fence_tag(self) -> &'static str {
        match self {
            BlockKind::Chart => "python.matplotlib",
            BlockKind::Diagram => "mermaid",
            BlockKind::Sketch => "p5js",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Chart => "chart",
            BlockKind::Diagram => "diagram",
            BlockKind::Sketch => "sketch",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One special block cut out of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub kind: BlockKind,
    /// Trimmed fence body. Empty for incomplete blocks: a placeholder must
    /// not leak partial source.
    pub body: String,
    pub complete: bool,
    /// Byte offset of the fence start token in the scanned buffer.
    pub start: usize,
}

/// Scan result: the buffer with every special block replaced by a marker
/// line, plus the blocks in buffer order. `blocks[i]` belongs to
/// `block_marker(i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBuffer {
    pub marked: String,
    pub blocks: Vec<FencedBlock>,
}

/// Marker line standing in for block `index` until fragment substitution.
pub fn block_marker(index: usize) -> String {
    format!("<!--ogx-block-{index}-->")
}

const CLOSE_TOKEN: &str = "\n```";

struct FenceOpen {
    kind: BlockKind,
    start: usize,
    /// First byte of the body, directly after the tag line's newline (or
    /// end-of-buffer when the stream stopped inside the tag line).
    body_start: usize,
}

/// Split the buffer into markdown text and special blocks. Deterministic:
/// the same buffer always produces the same result.
pub fn scan(buffer: &str) -> ScannedBuffer {
    let mut marked = String::with_capacity(buffer.len());
    let mut blocks: Vec<FencedBlock> = Vec::new();
    let mut pos = 0;

    while let Some(open) = next_fence_open(buffer, pos) {
        marked.push_str(&buffer[pos..open.start]);
        push_marker(&mut marked, blocks.len());

        match find_close(buffer, open.body_start) {
            Some(close) => {
                let body_end = close.max(open.body_start);
                blocks.push(FencedBlock {
                    kind: open.kind,
                    body: buffer[open.body_start..body_end].trim().to_string(),
                    complete: true,
                    start: open.start,
                });
                pos = close + CLOSE_TOKEN.len();
            }
            None => {
                blocks.push(FencedBlock {
                    kind: open.kind,
                    body: String::new(),
                    complete: false,
                    start: open.start,
                });
                return ScannedBuffer { marked, blocks };
            }
        }
    }

    marked.push_str(&buffer[pos..]);
    ScannedBuffer { marked, blocks }
}

/// Earliest special fence start at or after `from`, across all kinds.
fn next_fence_open(buffer: &str, from: usize) -> Option<FenceOpen> {
    let mut best: Option<FenceOpen> = None;
    for kind in BlockKind::ALL {
        let token = format!("```{}", kind.fence_tag());
        let mut search = from;
        while let Some(rel) = buffer[search..].find(&token) {
            let start = search + rel;
            let after_tag = start + token.len();
            match tag_boundary(buffer, after_tag) {
                Some(body_start) => {
                    if best.as_ref().map_or(true, |b| start < b.start) {
                        best = Some(FenceOpen { kind, start, body_start });
                    }
                    break;
                }
                // Not a real fence of this kind (e.g. ```mermaidish);
                // keep looking further right.
                None => search = after_tag,
            }
        }
    }
    best
}

/// A fence tag ends at optional spaces then a newline or end-of-buffer.
/// Returns the body start index, or None when other characters follow the
/// tag (a longer, unrelated language tag).
fn tag_boundary(buffer: &str, mut idx: usize) -> Option<usize> {
    let bytes = buffer.as_bytes();
    while idx < bytes.len() && (bytes[idx] == b' ' || bytes[idx] == b'\r') {
        idx += 1;
    }
    if idx >= bytes.len() {
        return Some(idx);
    }
    if bytes[idx] == b'\n' {
        return Some(idx + 1);
    }
    None
}

/// Find the close token. The tag line's own newline may double as the close
/// token's newline (` ```mermaid\n``` ` is a complete, empty block), so the
/// search starts one byte before the body.
fn find_close(buffer: &str, body_start: usize) -> Option<usize> {
    let from = body_start.saturating_sub(1);
    buffer[from..].find(CLOSE_TOKEN).map(|rel| from + rel)
}

/// Markers must sit alone between blank lines so every markdown converter
/// treats them as opaque HTML blocks.
fn push_marker(marked: &mut String, index: usize) {
    if !marked.is_empty() && !marked.ends_with("\n\n") {
        if marked.ends_with('\n') {
            marked.push('\n');
        } else {
            marked.push_str("\n\n");
        }
    }
    marked.push_str(&block_marker(index));
    marked.push_str("\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_markdown_passes_through() {
        let scanned = scan("# Başlık\n\nMetin ve ```rust\nfn x() {}\n``` kodu.");
        assert!(scanned.blocks.is_empty());
        assert_eq!(scanned.marked, "# Başlık\n\nMetin ve ```rust\nfn x() {}\n``` kodu.");
    }

    #[test]
    fn test_complete_block_is_cut_out() {
        let scanned = scan("önce\n\n```mermaid\nflowchart TD\nA-->B\n```\n\nsonra");
        assert_eq!(scanned.blocks.len(), 1);
        let block = &scanned.blocks[0];
        assert_eq!(block.kind, BlockKind::Diagram);
        assert!(block.complete);
        assert_eq!(block.body, "flowchart TD\nA-->B");
        assert!(scanned.marked.contains(&block_marker(0)));
        assert!(!scanned.marked.contains("```mermaid"));
        assert!(scanned.marked.contains("önce"));
        assert!(scanned.marked.contains("sonra"));
    }

    #[test]
    fn test_mixed_kinds_in_buffer_order() {
        let buffer = "```python.matplotlib\nplt.plot([1])\n```\nara\n```p5js\nfunction setup() {}\n```\n";
        let scanned = scan(buffer);
        assert_eq!(scanned.blocks.len(), 2);
        assert_eq!(scanned.blocks[0].kind, BlockKind::Chart);
        assert_eq!(scanned.blocks[1].kind, BlockKind::Sketch);
        let first = scanned.marked.find(&block_marker(0)).unwrap();
        let second = scanned.marked.find(&block_marker(1)).unwrap();
        assert!(first < second);
        assert!(scanned.marked.contains("ara"));
    }

    #[test]
    fn test_incomplete_fence_truncates_and_stops() {
        let buffer = "Metin.\n\n```mermaid\nflowchart TD\nA-->B\n\nBu satır kaybolur";
        let scanned = scan(buffer);
        assert_eq!(scanned.blocks.len(), 1);
        assert!(!scanned.blocks[0].complete);
        assert!(scanned.blocks[0].body.is_empty());
        assert!(scanned.marked.contains("Metin."));
        assert!(!scanned.marked.contains("```"));
        assert!(!scanned.marked.contains("kaybolur"));
        assert!(scanned.marked.trim_end().ends_with(&block_marker(0)));
    }

    #[test]
    fn test_fence_start_at_end_of_buffer_is_incomplete() {
        let scanned = scan("Grafik geliyor:\n\n```python.matplotlib");
        assert_eq!(scanned.blocks.len(), 1);
        assert_eq!(scanned.blocks[0].kind, BlockKind::Chart);
        assert!(!scanned.blocks[0].complete);
    }

    #[test]
    fn test_longer_language_tag_is_not_special() {
        let scanned = scan("```mermaidjs\ngraph TD\n```\n");
        assert!(scanned.blocks.is_empty());
        assert!(scanned.marked.contains("```mermaidjs"));
    }

    #[test]
    fn test_empty_body_block_is_complete() {
        let scanned = scan("```mermaid\n```\ndevam");
        assert_eq!(scanned.blocks.len(), 1);
        assert!(scanned.blocks[0].complete);
        assert!(scanned.blocks[0].body.is_empty());
        assert!(scanned.marked.contains("devam"));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let buffer = "a\n```mermaid\nflowchart TD\nA-->B\n```\nb\n```p5js\nlet x;\n```\nc\n```python.matplotlib\nplt.plot";
        assert_eq!(scan(buffer), scan(buffer));
    }

    #[test]
    fn test_trailing_spaces_after_tag_still_open() {
        let scanned = scan("```mermaid  \nflowchart LR\nX-->Y\n```");
        assert_eq!(scanned.blocks.len(), 1);
        assert!(scanned.blocks[0].complete);
        assert_eq!(scanned.blocks[0].body, "flowchart LR\nX-->Y");
    }

    #[test]
    fn test_second_open_after_complete_block_goes_incomplete() {
        let buffer = "```mermaid\nflowchart TD\nA-->B\n```\nmetin\n```mermaid\nflowchart LR";
        let scanned = scan(buffer);
        assert_eq!(scanned.blocks.len(), 2);
        assert!(scanned.blocks[0].complete);
        assert!(!scanned.blocks[1].complete);
        assert!(scanned.marked.contains("metin"));
        assert!(!scanned.marked.contains("flowchart LR"));
    }
}
