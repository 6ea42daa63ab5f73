use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::{strip_data_prefix, Chunk, DATA_PREFIX, DONE_MARKER};
use super::classify;
use crate::error::StreamError;
use crate::types::DeltaEvent;

/// Receiver of decoder output
pub trait DeltaSink {
    fn on_delta(&mut self, event: DeltaEvent);

    fn on_error(&mut self, error: StreamError);
}

/// Collects output in arrival order
impl DeltaSink for Vec<Result<DeltaEvent, StreamError>> {
    fn on_delta(&mut self, event: DeltaEvent) {
        self.push(Ok(event));
    }

    fn on_error(&mut self, error: StreamError) {
        self.push(Err(error));
    }
}

/// Adapts a pair of closures into a [`DeltaSink`]
pub struct FnSink<D, E> {
    on_delta: D,
    on_error: E,
}

impl<D, E> FnSink<D, E>
where
    D: FnMut(DeltaEvent),
    E: FnMut(StreamError),
{
    pub fn new(on_delta: D, on_error: E) -> Self {
        Self { on_delta, on_error }
    }
}

impl<D, E> DeltaSink for FnSink<D, E>
where
    D: FnMut(DeltaEvent),
    E: FnMut(StreamError),
{
    fn on_delta(&mut self, event: DeltaEvent) {
        (self.on_delta)(event)
    }

    fn on_error(&mut self, error: StreamError) {
        (self.on_error)(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Finished,
    Errored,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderOptions {
    /// Upper bound on `data:` lines evaluated inside one embedded block
    pub max_embedded_lines: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_embedded_lines: 256,
        }
    }
}

impl DecoderOptions {
    pub fn with_max_embedded_lines(mut self, max: usize) -> Self {
        self.max_embedded_lines = max;
        self
    }
}

/// Decoder state for one streamed response.
///
/// Feed each raw event with [`DecodeSession::on_raw_event`]. The session
/// emits at most one terminal item (a finish delta or an error) and ignores
/// everything after it.
#[derive(Debug)]
pub struct DecodeSession {
    id: Uuid,
    state: SessionState,
    options: DecoderOptions,
}

impl Default for DecodeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeSession {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Open,
            options,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Caller-initiated stop. No error is reported for it.
    pub fn cancel(&mut self) {
        if self.is_open() {
            tracing::debug!(session = %self.id, "Decode session cancelled");
            self.state = SessionState::Cancelled;
        }
    }

    /// Report a connection-level failure once and close the session
    pub fn on_transport_error<S: DeltaSink + ?Sized>(&mut self, error: StreamError, sink: &mut S) {
        self.fail(error, sink);
    }

    /// Decode one event payload as delivered by the transport
    pub fn on_raw_event<S: DeltaSink + ?Sized>(&mut self, raw: &str, sink: &mut S) {
        if !self.is_open() {
            tracing::trace!(session = %self.id, state = ?self.state, "Dropping event for closed session");
            return;
        }

        let trimmed = raw.trim();
        if trimmed == DONE_MARKER {
            self.emit(DeltaEvent::finish(), sink);
            return;
        }
        if trimmed.is_empty() {
            return;
        }

        let payload = strip_data_prefix(trimmed);
        if payload.is_empty() {
            return;
        }

        match Chunk::from_payload(payload) {
            Some(chunk) => self.apply(chunk, sink),
            None => self.fallback(trimmed, payload, sink),
        }
    }

    fn fallback<S: DeltaSink + ?Sized>(&mut self, raw: &str, payload: &str, sink: &mut S) {
        if classify::is_auth_failure(payload) {
            self.fail(
                StreamError::Auth {
                    reason: payload.to_string(),
                },
                sink,
            );
            return;
        }

        if classify::is_embedded_block(raw) {
            self.decode_embedded(raw, sink);
            return;
        }

        if classify::is_technical(payload) {
            tracing::debug!(session = %self.id, len = payload.len(), "Discarding truncated chunk fragment");
            return;
        }

        self.emit(DeltaEvent::text(payload), sink);
    }

    fn decode_embedded<S: DeltaSink + ?Sized>(&mut self, block: &str, sink: &mut S) {
        let mut evaluated = 0usize;

        for line in block.lines() {
            if !self.is_open() {
                break;
            }

            let Some(data) = line.trim().strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }

            if evaluated == self.options.max_embedded_lines {
                tracing::warn!(
                    session = %self.id,
                    limit = self.options.max_embedded_lines,
                    "Embedded event block exceeds line limit, dropping the rest"
                );
                break;
            }
            evaluated += 1;

            match Chunk::from_payload(data) {
                Some(chunk) => self.apply(chunk, sink),
                None => tracing::debug!(session = %self.id, "Skipping unparseable embedded line"),
            }
        }
    }

    fn apply<S: DeltaSink + ?Sized>(&mut self, chunk: Chunk, sink: &mut S) {
        match chunk {
            Chunk::Done | Chunk::UsageOnly => self.emit(DeltaEvent::finish(), sink),
            Chunk::Error(value) => self.fail(StreamError::Upstream(value), sink),
            Chunk::Delta {
                content,
                finish_reason,
            } => {
                if !content.is_empty() || finish_reason.is_some() {
                    self.emit(
                        DeltaEvent {
                            text: content,
                            is_finish: finish_reason.is_some(),
                        },
                        sink,
                    );
                }
            }
            Chunk::Empty => {}
        }
    }

    fn emit<S: DeltaSink + ?Sized>(&mut self, event: DeltaEvent, sink: &mut S) {
        if !self.is_open() {
            return;
        }
        if event.is_finish {
            self.state = SessionState::Finished;
        }
        sink.on_delta(event);
    }

    fn fail<S: DeltaSink + ?Sized>(&mut self, error: StreamError, sink: &mut S) {
        if !self.is_open() {
            return;
        }
        tracing::warn!(session = %self.id, error = %error, "Decode session failed");
        self.state = SessionState::Errored;
        sink.on_error(error);
    }
}
