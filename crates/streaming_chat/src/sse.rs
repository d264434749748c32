//! Server-sent events decoding for streamed chat completions.
//!
//! Bytes are buffered until a blank line closes a frame, so UTF-8 sequences
//! and JSON payloads may be split across network reads at any offset.

use crate::chat_completions::ChatCompletionChunk;
use crate::Result;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug)]
pub enum SseEvent {
    Chunk(ChatCompletionChunk),
    /// The provider sent `data: [DONE]`.
    Done,
}

/// Incremental parser for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<SseEvent>> {
        self.buffer
            .extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));

        let mut events = Vec::new();
        while let Some(split) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            if let Some(event) = parse_frame(&frame[..split]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing frame that was not closed by a blank line.
    pub fn finish(&mut self) -> Option<Result<SseEvent>> {
        let frame = std::mem::take(&mut self.buffer);
        parse_frame(&frame)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

fn parse_frame(frame: &[u8]) -> Option<Result<SseEvent>> {
    let frame = String::from_utf8_lossy(frame);
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        return None;
    }

    let payload = data_lines.join("\n");
    if payload == DONE_SENTINEL {
        return Some(Ok(SseEvent::Done));
    }

    Some(
        serde_json::from_str::<ChatCompletionChunk>(&payload)
            .map(SseEvent::Chunk)
            .map_err(Into::into),
    )
}
