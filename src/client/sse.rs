//! SSE parsing for the client side of `tasks/sendSubscribe`.
//!
//! The server writes one `data:` line per frame, each carrying a JSON-RPC
//! success envelope whose `result` is a stream event. The decoder is
//! sans-IO: feed it body chunks, collect complete frame payloads.

use serde::Deserialize;

use crate::error::{A2AError, Result};
use crate::types::TaskStreamEvent;

/// Incremental SSE frame decoder.
///
/// Accumulates `data:` lines until the blank line that terminates a frame,
/// tolerating frames split across arbitrary chunk boundaries. Comment lines
/// and unknown fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    current_data: String,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk, returning any completed frame payloads.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(payload) = self.accept_line(line.trim_end_matches(['\n', '\r'])) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing frame that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let buffer = std::mem::take(&mut self.buffer);
        if let Some(payload) = self.accept_line(&buffer) {
            return Some(payload);
        }
        if self.current_data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current_data))
        }
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.current_data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.current_data));
        }

        if let Some(data) = line.strip_prefix("data:") {
            if !self.current_data.is_empty() {
                self.current_data.push('\n');
            }
            self.current_data.push_str(data.trim_start());
        }
        // event:/id:/retry: fields and `:` comments are not part of this
        // protocol's frames; skip them.
        None
    }
}

/// One side of a JSON-RPC response envelope, for frame decoding.
#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    result: Option<TaskStreamEvent>,
    #[serde(default)]
    error: Option<A2AError>,
}

/// Decodes one frame payload into a stream event.
pub fn decode_frame(payload: &str) -> Result<TaskStreamEvent> {
    let reply: RawReply = serde_json::from_str(payload)
        .map_err(|e| A2AError::internal_error(format!("malformed stream frame: {}", e)))?;

    if let Some(error) = reply.error {
        return Err(error);
    }
    reply
        .result
        .ok_or_else(|| A2AError::internal_error("stream frame carried neither result nor error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskState;

    const FRAME: &str = r#"{"jsonrpc":"2.0","id":"r1","result":{"id":"t1","status":{"state":"working","timestamp":"2026-01-01T00:00:00.000Z"},"final":false}}"#;

    #[test]
    fn test_decoder_single_frame() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&format!("data: {}\n\n", FRAME));
        assert_eq!(payloads, vec![FRAME.to_string()]);
    }

    #[test]
    fn test_decoder_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let wire = format!("data: {}\n\n", FRAME);
        let (a, b) = wire.split_at(25);

        let mut payloads = decoder.feed(a);
        payloads.extend(decoder.feed(b));
        assert_eq!(payloads, vec![FRAME.to_string()]);
    }

    #[test]
    fn test_decoder_two_frames_one_chunk() {
        let mut decoder = SseDecoder::new();
        let wire = format!("data: {FRAME}\n\ndata: {FRAME}\n\n");
        let payloads = decoder.feed(&wire);
        assert_eq!(payloads.len(), 2);
    }

    #[test]
    fn test_decoder_ignores_comments() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&format!(": keep-alive\ndata: {}\n\n", FRAME));
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_decoder_finish_flushes_tail() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&format!("data: {}", FRAME)).is_empty());
        assert_eq!(decoder.finish(), Some(FRAME.to_string()));
    }

    #[test]
    fn test_decode_frame_result() {
        let event = decode_frame(FRAME).unwrap();
        match event {
            TaskStreamEvent::Status(e) => {
                assert_eq!(e.id, "t1");
                assert_eq!(e.status.state, TaskState::Working);
                assert!(!e.is_final);
            }
            other => panic!("expected status event, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_frame_error_envelope() {
        let payload = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"broken"}}"#;
        let err = decode_frame(payload).unwrap_err();
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "broken");
    }

    #[test]
    fn test_decode_frame_garbage() {
        assert!(decode_frame("not json").is_err());
    }
}
