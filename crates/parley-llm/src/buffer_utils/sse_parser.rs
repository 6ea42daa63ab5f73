use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::de::IgnoredAny;
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::CircularLineBuffer;
use crate::error::StreamError;
use crate::streaming::DONE_MARKER;

pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Groups SSE lines into event payloads.
///
/// `data:` values accumulate until a blank line dispatches them, joined by
/// `\n`. A `data:` line that follows an already complete payload (a JSON
/// value or `[DONE]`) dispatches the pending payload first, so backends that
/// separate events with a single newline still yield one payload per event.
/// `event:`, `id:`, `retry:` and `:` comment lines are dropped. Any other
/// non-empty line is kept as payload so backends that answer with plain text
/// still reach the decoder.
#[derive(Debug, Default)]
pub struct SseEventSplitter {
    data: Vec<String>,
}

impl SseEventSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one trimmed line; returns a payload when an event completes
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.flush();
        }

        if line.starts_with(':') {
            return None;
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            let ready = if self.pending_is_complete() {
                self.flush()
            } else {
                None
            };
            self.data.push(value.to_string());
            return ready;
        }

        if ["event:", "id:", "retry:"].iter().any(|field| line.starts_with(field)) {
            return None;
        }

        self.data.push(line.to_string());
        None
    }

    fn pending_is_complete(&self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        let pending = self.data.join("\n");
        let pending = pending.trim();
        pending == DONE_MARKER || serde_json::from_str::<IgnoredAny>(pending).is_ok()
    }

    /// Dispatch whatever is pending (end of stream or blank line)
    pub fn flush(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

/// Split a raw byte stream into SSE event payloads.
///
/// A byte-stream failure is yielded once as a transport error and ends the
/// stream. Lines that are not valid UTF-8 are skipped.
pub fn split_sse_events<S, B, E>(bytes: S) -> PayloadStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut splitter = SseEventSplitter::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    buffer.extend(chunk.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        match line_result {
                            Ok(line) => {
                                if let Some(payload) = splitter.push_line(&line) {
                                    yield Ok(payload);
                                }
                            }
                            Err(e) => tracing::warn!("Skipping undecodable SSE line: {}", e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(StreamError::transport(format!("Stream error: {}", e)));
                    return;
                }
            }
        }

        if let Some(line_result) = buffer.take_remaining() {
            match line_result {
                Ok(line) => {
                    if let Some(payload) = splitter.push_line(&line) {
                        yield Ok(payload);
                    }
                }
                Err(e) => tracing::warn!("Skipping undecodable SSE line: {}", e),
            }
        }

        if let Some(payload) = splitter.flush() {
            yield Ok(payload);
        }
    })
}

/// SSE payloads of a streaming HTTP response
pub fn parse_sse_stream(response: Response) -> PayloadStream {
    split_sse_events(response.bytes_stream())
}
