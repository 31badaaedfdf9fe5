//! Line reassembly across transport chunk boundaries

/// Buffer for accumulating incomplete upstream lines across chunk boundaries.
///
/// Upstream data arrives as byte chunks that may not align with line
/// boundaries, and a chunk may even end in the middle of a multi-byte UTF-8
/// sequence. Residual bytes are kept raw and only decoded once the line they
/// belong to is complete.
///
/// # Example
/// ```
/// use chat_relay::streaming::LineBuffer;
///
/// let mut buffer = LineBuffer::new();
///
/// // First chunk contains partial line
/// let lines1 = buffer.feed(b"{\"message\":{\"content\":\"hel");
/// assert!(lines1.is_empty()); // No complete lines yet
///
/// // Second chunk completes the line
/// let lines2 = buffer.feed(b"lo\"}}\n");
/// assert_eq!(lines2, vec!["{\"message\":{\"content\":\"hello\"}}"]);
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes received after the last newline
    residual: Vec<u8>,
}

impl LineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            residual: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete, non-empty lines.
    ///
    /// The `\n` terminator and a trailing `\r` are stripped from returned
    /// lines. Incomplete trailing data is retained for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.residual.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.residual[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if let Some(line) = decode_line(&self.residual[start..end]) {
                complete_lines.push(line);
            }
            start = end + 1;
        }

        self.residual.drain(..start);
        complete_lines
    }

    /// Take whatever unterminated line remains, leaving the buffer empty.
    ///
    /// Call this at end of stream; an upstream is not required to terminate
    /// its final line.
    pub fn take_remaining(&mut self) -> Option<String> {
        let residual = std::mem::take(&mut self.residual);
        decode_line(&residual)
    }

    /// Check if there's any incomplete data remaining in the buffer.
    pub fn has_incomplete(&self) -> bool {
        !self.residual.is_empty()
    }
}

/// Decode one raw line, replacing invalid UTF-8 and dropping blank lines.
fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}
