// src/framer.rs
//
// Line framing for the capture stream. Accumulates the raw chunks that
// bounded-timeout reads produce and emits complete decoded lines; the
// stream's content is opaque text, never a protocol.

/// Force a split once a line grows past this many bytes, so a device that
/// never sends LF cannot grow the buffer without bound.
const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into LF-terminated lines with best-effort UTF-8
/// decoding. Invalid sequences are dropped, not fatal; the drop count is
/// kept for end-of-session diagnostics.
#[derive(Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    invalid_drops: u64,
}

impl LineFramer {
    pub fn new() -> Self {
        LineFramer::default()
    }

    /// Feed one read chunk; returns every line completed by it, in order.
    /// A trailing CR is stripped from each line.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in data {
            if byte == b'\n' {
                lines.push(self.take_line());
            } else {
                self.buffer.push(byte);
                if self.buffer.len() >= MAX_LINE_LEN {
                    lines.push(self.take_line());
                }
            }
        }
        lines
    }

    /// Hand back the unterminated tail, if any. Draining only; the capture
    /// loop never emits a line that was not completed by the device.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    /// Invalid byte sequences dropped during decoding so far.
    pub fn invalid_drops(&self) -> u64 {
        self.invalid_drops
    }

    fn take_line(&mut self) -> String {
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let decoded = String::from_utf8_lossy(&self.buffer);
        let text = if decoded.contains('\u{FFFD}') {
            self.invalid_drops += decoded.matches('\u{FFFD}').count() as u64;
            decoded.chars().filter(|&c| c != '\u{FFFD}').collect()
        } else {
            decoded.into_owned()
        };
        self.buffer.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"hel").is_empty());
        assert_eq!(framer.feed(b"lo\nwor"), vec!["hello"]);
        assert_eq!(framer.feed(b"ld\n"), vec!["world"]);
    }

    #[test]
    fn test_crlf_terminators() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"boot ok\r\nready\r\n"), vec!["boot ok", "ready"]);
    }

    #[test]
    fn test_blank_lines_are_emitted_empty() {
        // The pipeline decides to skip them; the framer stays faithful.
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"\n\n"), vec!["", ""]);
    }

    #[test]
    fn test_invalid_bytes_dropped_and_counted() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"ok \xff\xfe here\n");
        assert_eq!(lines, vec!["ok  here"]);
        assert!(framer.invalid_drops() > 0);
    }

    #[test]
    fn test_oversized_line_is_force_split() {
        let mut framer = LineFramer::new();
        let mut data = vec![b'a'; MAX_LINE_LEN + 100];
        data.push(b'\n');
        let lines = framer.feed(&data);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
        assert_eq!(lines[1].len(), 100);
    }

    #[test]
    fn test_flush_returns_unterminated_tail() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"partial").is_empty());
        assert_eq!(framer.flush().unwrap(), "partial");
        assert_eq!(framer.flush(), None);
    }

    #[test]
    fn test_utf8_multibyte_survives_decoding() {
        let mut framer = LineFramer::new();
        let lines = framer.feed("连接失败\n".as_bytes());
        assert_eq!(lines, vec!["连接失败"]);
        assert_eq!(framer.invalid_drops(), 0);
    }
}
