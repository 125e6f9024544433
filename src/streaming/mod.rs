//! Line-oriented streaming utilities
//!
//! The vendor streams `data: {...}` lines over a chunked HTTP body. Chunks
//! rarely align with line boundaries (or with UTF-8 character boundaries), so
//! every stream consumer runs its bytes through a [`LineBuffer`] first.

/// Buffer for accumulating incomplete lines across chunk boundaries.
///
/// Bytes are held undecoded until a full line is available, so multi-byte
/// characters split across two chunks come out intact.
///
/// # Example
/// ```
/// use mirage::streaming::LineBuffer;
///
/// let mut buffer = LineBuffer::new();
///
/// let lines1 = buffer.feed(b"data: {\"content\":\"hel");
/// assert!(lines1.is_empty());
///
/// let lines2 = buffer.feed(b"lo\"}\n");
/// assert_eq!(lines2, vec!["data: {\"content\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes of the line currently being assembled
    incomplete: Vec<u8>,
}

impl LineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// Complete lines are those ending with `\n`; the terminator (and a
    /// preceding `\r`) is stripped. Blank lines are skipped since SSE uses
    /// them as event separators. Invalid UTF-8 inside a line is replaced
    /// with U+FFFD rather than failing the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.incomplete[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if let Some(line) = decode_line(&self.incomplete[start..end]) {
                complete_lines.push(line);
            }
            start = end + 1;
        }

        self.incomplete.drain(..start);
        complete_lines
    }

    /// Check if there's any incomplete data remaining in the buffer.
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Take the trailing unterminated line, if any.
    ///
    /// Call this once the transport closes: a vendor that omits the final
    /// newline still gets its last line processed.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.incomplete);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}
