//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Bytes arrive in arbitrary chunks from the HTTP body; [`SseDecoder`]
//! buffers partial lines and yields a [`SseFrame`] each time a blank line
//! terminates an event block. Line endings may be LF, CRLF or a lone CR.

use bytes::{Buf, BytesMut};

/// Event name used when a block carries no `event:` field.
pub const DEFAULT_EVENT: &str = "message";

/// Longest unterminated line kept in memory. Anything longer is dropped
/// up to its terminator.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, or [`DEFAULT_EVENT`].
    pub event: String,
    /// All `data:` lines of the block joined with `\n`.
    pub data: String,
    /// Last `id:` value seen on the stream, if any.
    pub id: Option<String>,
}

/// Stateful line parser for an SSE body.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: String,
    has_data: bool,
    last_id: Option<String>,
    started: bool,
    /// Bytes at the front of `buf` already searched for a terminator.
    scanned: usize,
    /// The next completed line is the tail of an oversized one.
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(line) = self.next_line() {
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buf.len() > MAX_LINE_LEN {
            tracing::warn!(
                len = self.buf.len(),
                limit = MAX_LINE_LEN,
                "discarding oversized SSE line"
            );
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
            self.event = None;
            self.data.clear();
            self.has_data = false;
        }
        frames
    }

    /// The most recent `id:` value, sent back as `Last-Event-ID` on reconnect.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Split the next complete line off the buffer.
    ///
    /// A trailing lone `\r` is held back until the next chunk shows
    /// whether it is the first half of a CRLF pair.
    fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self
            .buf
            .iter()
            .skip(self.scanned)
            .position(|b| *b == b'\n' || *b == b'\r')
        else {
            self.scanned = self.buf.len();
            return None;
        };
        let pos = self.scanned + offset;

        let terminator_len = if self.buf[pos] == b'\r' {
            match self.buf.get(pos + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                None => {
                    self.scanned = pos;
                    return None;
                }
            }
        } else {
            1
        };

        let raw = self.buf.split_to(pos);
        self.buf.advance(terminator_len);
        self.scanned = 0;

        let mut line = String::from_utf8_lossy(&raw).into_owned();
        if !self.started {
            self.started = true;
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_owned();
            }
        }
        Some(line)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_id = Some(value.to_owned());
                }
            }
            "retry" => {
                tracing::trace!(value, "ignoring SSE retry hint; reconnect delay is fixed");
            }
            other => {
                tracing::trace!(field = other, "ignoring unknown SSE field");
            }
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }

        self.has_data = false;
        Some(SseFrame {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }

    #[test]
    fn decodes_named_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: motion\ndata: {\"scope\":\"hall\"}\n\n");
        assert_eq!(frames, vec![frame("motion", "{\"scope\":\"hall\"}")]);
    }

    #[test]
    fn unnamed_event_defaults_to_message() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: hello\n\n");
        assert_eq!(frames, vec![frame(DEFAULT_EVENT, "hello")]);
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: temperature\ndata: 31\ndata: celsius\n\n");
        assert_eq!(frames, vec![frame("temperature", "31\ncelsius")]);
    }

    #[test]
    fn handles_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: temp").is_empty());
        assert!(decoder.feed(b"Alarm\nda").is_empty());
        assert!(decoder.feed(b"ta: 33.5\n").is_empty());
        let frames = decoder.feed(b"\n");
        assert_eq!(frames, vec![frame("tempAlarm", "33.5")]);
    }

    #[test]
    fn accepts_crlf_and_lone_cr() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: tempCleared\r\ndata: ok\r\n\r\nevent: tempResume\rdata: go\r\r");
        // The final lone CR is held back until the next chunk arrives.
        assert_eq!(frames, vec![frame("tempCleared", "ok")]);

        let frames = decoder.feed(b"\n");
        assert_eq!(frames, vec![frame("tempResume", "go")]);
    }

    #[test]
    fn crlf_split_between_chunks_is_one_terminator() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: a\r").is_empty());
        assert!(decoder.feed(b"\n\r").is_empty());
        let frames = decoder.feed(b"\n");
        assert_eq!(frames, vec![frame(DEFAULT_EVENT, "a")]);
    }

    #[test]
    fn comments_and_empty_blocks_are_skipped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\n\nevent: motion\n\ndata: x\n\n");
        // An event name without data never dispatches and does not leak
        // into the next block.
        assert_eq!(frames, vec![frame(DEFAULT_EVENT, "x")]);
    }

    #[test]
    fn tracks_last_event_id() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"id: 41\nevent: motion\ndata: porch\n\ndata: again\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id.as_deref(), Some("41"));
        assert_eq!(frames[1].id.as_deref(), Some("41"));
        assert_eq!(decoder.last_event_id(), Some("41"));
    }

    #[test]
    fn strips_single_leading_space_only() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data:  padded\ndata:tight\n\n");
        assert_eq!(frames[0].data, " padded\ntight");
    }

    #[test]
    fn strips_leading_bom() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed("\u{feff}event: motion\ndata: attic\n\n".as_bytes());
        assert_eq!(frames, vec![frame("motion", "attic")]);
    }

    #[test]
    fn oversized_line_is_dropped_and_decoding_recovers() {
        let mut decoder = SseDecoder::new();
        let chunk = vec![b'x'; MAX_LINE_LEN / 2 + 1];

        assert!(decoder.feed(b"data: ").is_empty());
        assert!(decoder.feed(&chunk).is_empty());
        assert!(decoder.feed(&chunk).is_empty());
        assert!(decoder.buf.is_empty(), "pending line should be capped");

        // The tail of the oversized line is skipped, the next event is not.
        let frames = decoder.feed(b"xxx\n\nevent: motion\ndata: porch\n\n");
        assert_eq!(frames, vec![frame("motion", "porch")]);
    }

    #[test]
    fn long_line_split_across_many_chunks_is_kept() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: ").is_empty());
        for _ in 0..100 {
            assert!(decoder.feed(b"0123456789").is_empty());
        }
        let frames = decoder.feed(b"\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), 1000);
    }

    #[test]
    fn field_without_colon_has_empty_value() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: tempResume\ndata\n\n");
        assert_eq!(frames, vec![frame("tempResume", "")]);
    }
}
