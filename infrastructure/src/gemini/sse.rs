//! Incremental SSE (Server-Sent Events) decoder.
//!
//! Feeds raw response chunks in, gets complete `data:` payloads out:
//! - Byte buffering, so a UTF-8 sequence split across chunks stays intact
//! - Line splitting (handles both `\n` and `\r\n`)
//! - Multi-line `data:` assembly until the blank line ending the event
//!
//! `event:`, `id:`, `retry:` and comment lines are skipped; the Gemini
//! stream carries everything in `data:`.

/// Push-style SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            self.push_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// End of input: flush a trailing line and an unterminated event.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            self.push_line(line.trim_end_matches('\r'), &mut events);
        }
        events.extend(self.take_event());
        events
    }

    fn push_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            events.extend(self.take_event());
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.data_lines.push(data.to_string());
        }
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: first\n\ndata: second\n\n");
        assert_eq!(events, vec!["first", "second"]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: test\r\n\r\n"), vec!["test"]);
    }

    #[test]
    fn handles_chunked_data() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"dat").is_empty());
        assert!(decoder.feed(b"a: hel").is_empty());
        assert!(decoder.feed(b"lo\n").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec!["hello"]);
    }

    #[test]
    fn keeps_multibyte_characters_split_across_chunks() {
        let payload = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'
        let split = "data: h".len() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&payload[..split]).is_empty());
        assert_eq!(decoder.feed(&payload[split..]), vec!["héllo"]);
    }

    #[test]
    fn aggregates_multiline_data() {
        let mut decoder = SseDecoder::new();
        assert_eq!(
            decoder.feed(b"data: hello\ndata: world\n\n"),
            vec!["hello\nworld"]
        );
    }

    #[test]
    fn skips_comments_and_metadata() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keepalive\nevent: message\nid: 7\ndata:value\n\n\n");
        assert_eq!(events, vec!["value"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: final").is_empty());
        assert_eq!(decoder.finish(), vec!["final"]);
        assert!(decoder.finish().is_empty());
    }
}
