//! Incremental Server-Sent-Events line parser.
//!
//! Bytes are buffered until a newline so frames survive arbitrary chunk
//! boundaries, including splits inside a multi-byte UTF-8 character. Each
//! `data:` line is emitted on its own, tied to the most recent `event:` line.

use serde_json::Value;
use tracing::warn;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// One `(event type, JSON payload)` pair read off the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: String,
    pub data: Value,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    current_event: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        frames
    }

    /// Flushes an unterminated trailing line once the stream has closed.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).into_owned();
        self.process_line(&line).into_iter().collect()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(event) = line.strip_prefix(EVENT_PREFIX) {
            self.current_event = event.trim().to_string();
            return None;
        }

        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(data) => Some(SseFrame {
                event: std::mem::take(&mut self.current_event),
                data,
            }),
            Err(e) => {
                warn!(event = %self.current_event, "Skipping malformed SSE data line: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STREAM: &str = "event: user_message\n\
        data: {\"id\":\"m1\",\"content\":\"Add a login page\"}\n\n\
        event: chunk\ndata: {\"text\":\"Sure, \"}\n\n\
        event: chunk\ndata: {\"text\":\"héllo ✓\"}\n\n\
        event: done\ndata: {\"conversation_id\":\"c1\"}\n\n";

    fn parse_all(chunks: &[&[u8]]) -> Vec<SseFrame> {
        let mut parser = SseParser::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(parser.push(chunk));
        }
        frames.extend(parser.finish());
        frames
    }

    #[test]
    fn parses_event_and_data_pairs() {
        let frames = parse_all(&[STREAM.as_bytes()]);
        let events: Vec<_> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(events, ["user_message", "chunk", "chunk", "done"]);
        assert_eq!(frames[1].data, json!({ "text": "Sure, " }));
    }

    #[test]
    fn any_split_point_yields_the_same_frames() {
        let bytes = STREAM.as_bytes();
        let whole = parse_all(&[bytes]);
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(parse_all(&[a, b]), whole, "split at byte {split}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_whole_stream() {
        let bytes = STREAM.as_bytes();
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(parse_all(&singles), parse_all(&[bytes]));
    }

    #[test]
    fn empty_data_is_never_emitted() {
        let frames = parse_all(&[b"event: done\ndata:\ndata:    \n"]);
        assert!(frames.is_empty());
    }

    #[test]
    fn empty_data_keeps_the_event_type_for_the_next_line() {
        let frames = parse_all(&[b"event: chunk\ndata:\ndata: {\"text\":\"a\"}\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "chunk");
    }

    #[test]
    fn malformed_json_is_skipped_without_aborting() {
        let frames = parse_all(&[
            b"event: chunk\ndata: {not json\n",
            b"data: {\"text\":\"still here\"}\n",
        ]);
        assert_eq!(frames.len(), 1);
        // The failed line did not consume the event type.
        assert_eq!(frames[0].event, "chunk");
        assert_eq!(frames[0].data["text"], "still here");
    }

    #[test]
    fn event_type_is_consumed_by_one_data_line() {
        let frames = parse_all(&[b"event: chunk\ndata: {\"text\":\"a\"}\ndata: {\"text\":\"b\"}\n"]);
        assert_eq!(frames[0].event, "chunk");
        assert_eq!(frames[1].event, "");
    }

    #[test]
    fn crlf_line_endings_and_comments() {
        let frames = parse_all(&[b": keep-alive\r\nevent: chunk\r\ndata: {\"text\":\"x\"}\r\n\r\n"]);
        assert_eq!(frames, vec![SseFrame { event: "chunk".into(), data: json!({ "text": "x" }) }]);
    }

    #[test]
    fn unterminated_final_line_is_flushed_on_finish() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: done\ndata: {}").is_empty());
        let frames = parser.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "done");
    }
}
