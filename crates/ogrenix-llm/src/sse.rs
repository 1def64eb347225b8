//! Line decoding for SSE response bodies.

/// Reassembles complete lines from raw body chunks. A chunk boundary can
/// fall anywhere, including inside a multi-byte UTF-8 sequence, so bytes
/// stay buffered until their line terminator arrives.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every line they complete, terminators
    /// stripped. A trailing partial line stays buffered for the next push.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}
