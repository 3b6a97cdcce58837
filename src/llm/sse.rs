//! Incremental server-sent-events framing.
//!
//! The endpoint streams `data: {json}\n\n` lines and ends with
//! `data: [DONE]`. Network reads can split a line (or a UTF-8 sequence)
//! anywhere, so [`SseDecoder`] buffers raw bytes and only emits complete
//! lines.

use crate::llm::endpoint::LlmError;

const DONE_MARKER: &str = "[DONE]";

/// A complete SSE event relevant to chat completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line.
    Data(String),
    /// The `[DONE]` sentinel; nothing after it is meaningful.
    Done,
}

/// Line-oriented SSE decoder. Feed it byte chunks in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once `[DONE]` has been seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Append `chunk` and return every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, LlmError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.parse_line(&line[..pos])? {
                events.push(event);
                if self.done {
                    self.buffer.clear();
                    return Ok(events);
                }
            }
        }
        self.scanned = self.buffer.len();
        Ok(events)
    }

    /// Flush a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Result<Option<SseEvent>, LlmError> {
        if self.done || self.buffer.is_empty() {
            return Ok(None);
        }
        let line = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.parse_line(&line)
    }

    fn parse_line(&mut self, raw: &[u8]) -> Result<Option<SseEvent>, LlmError> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| LlmError::Parse(format!("stream line is not UTF-8: {e}")))?;
        let line = line.strip_suffix('\r').unwrap_or(line);

        // Blank separators, `:` comments and non-data fields carry nothing.
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(None);
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == DONE_MARKER {
            self.done = true;
            return Ok(Some(SseEvent::Done));
        }
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(SseEvent::Data(data.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(s: &str) -> SseEvent {
        SseEvent::Data(s.to_string())
    }

    #[test]
    fn decodes_complete_frames() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n")
            .expect("push");
        assert_eq!(events, vec![data("{\"a\":1}"), data("{\"b\":2}"), SseEvent::Done]);
        assert!(decoder.is_done());
    }

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").expect("push").is_empty());
        assert!(decoder.push(b"ta: {\"x\":").expect("push").is_empty());
        let events = decoder.push(b"\"y\"}\n").expect("push");
        assert_eq!(events, vec![data("{\"x\":\"y\"}")]);
    }

    #[test]
    fn multibyte_text_split_mid_character() {
        let frame = "data: {\"t\":\"\u{e9}l\u{e8}ve\"}\n".as_bytes();
        // Split inside the two-byte encoding of the first accented letter.
        let cut = frame.iter().position(|&b| b == 0xC3).expect("multibyte") + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&frame[..cut]).expect("push").is_empty());
        let events = decoder.push(&frame[cut..]).expect("push");
        assert_eq!(events, vec![data("{\"t\":\"\u{e9}l\u{e8}ve\"}")]);
    }

    #[test]
    fn crlf_and_missing_space_are_tolerated() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data:{\"a\":1}\r\n\r\n").expect("push");
        assert_eq!(events, vec![data("{\"a\":1}")]);
    }

    #[test]
    fn comments_and_other_fields_are_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .push(b": keep-alive\nevent: message\nid: 7\nretry: 100\ndata: {}\n")
            .expect("push");
        assert_eq!(events, vec![data("{}")]);
    }

    #[test]
    fn nothing_after_done_is_emitted() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .push(b"data: [DONE]\ndata: {\"late\":true}\n")
            .expect("push");
        assert_eq!(events, vec![SseEvent::Done]);
        assert!(decoder.push(b"data: {}\n").expect("push").is_empty());
        assert_eq!(decoder.finish().expect("finish"), None);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"tail\":1}").expect("push").is_empty());
        assert_eq!(decoder.finish().expect("finish"), Some(data("{\"tail\":1}")));
        assert_eq!(decoder.finish().expect("finish"), None);
    }

    #[test]
    fn long_line_fed_bytewise_is_scanned_once() {
        let payload = format!("{{\"t\":\"{}\"}}", "a".repeat(20_000));
        let frame = format!("data: {payload}\n");

        let mut decoder = SseDecoder::new();
        let (body, newline) = frame.as_bytes().split_at(frame.len() - 1);
        for byte in body {
            assert!(decoder.push(std::slice::from_ref(byte)).expect("push").is_empty());
            assert_eq!(decoder.scanned, decoder.buffer.len());
        }
        assert_eq!(decoder.push(newline).expect("push"), vec![data(&payload)]);
        assert_eq!(decoder.scanned, 0);
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn partial_line_after_complete_one_is_kept() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\ndata: {\"b\"").expect("push");
        assert_eq!(events, vec![data("{\"a\":1}")]);
        let events = decoder.push(b":2}\n").expect("push");
        assert_eq!(events, vec![data("{\"b\":2}")]);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let mut decoder = SseDecoder::new();
        let err = decoder.push(b"data: \xff\xfe\n").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }
}
