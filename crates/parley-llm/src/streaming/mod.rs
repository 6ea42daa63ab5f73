mod chunk;
mod classify;
mod session;

pub use chunk::{strip_data_prefix, Chunk, DATA_PREFIX, DONE_MARKER};
pub use classify::{is_auth_failure, is_embedded_block, is_technical};
pub use session::{DecodeSession, DecoderOptions, DeltaSink, FnSink, SessionState};

use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::error::StreamError;
use crate::types::DeltaEvent;

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<DeltaEvent, StreamError>> + Send>>;

/// Lazily decode a stream of raw event payloads.
///
/// Transport errors from `payloads` are reported once as an `Err` item. The
/// returned stream ends right after the terminal item (finish or error).
pub fn decode_events<S>(payloads: S, options: DecoderOptions) -> DeltaStream
where
    S: Stream<Item = Result<String, StreamError>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut payloads = Box::pin(payloads);
        let mut session = DecodeSession::with_options(options);

        while let Some(item) = payloads.next().await {
            let mut out: Vec<Result<DeltaEvent, StreamError>> = Vec::new();
            match item {
                Ok(raw) => session.on_raw_event(&raw, &mut out),
                Err(e) => session.on_transport_error(e, &mut out),
            }

            for result in out {
                yield result;
            }

            if session.is_terminal() {
                break;
            }
        }

        if session.is_open() {
            tracing::warn!(session = %session.id(), "Stream closed without a terminal event");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn payloads(items: Vec<Result<&'static str, StreamError>>) -> impl Stream<Item = Result<String, StreamError>> + Send {
        stream::iter(items.into_iter().map(|r| r.map(str::to_string)))
    }

    #[tokio::test]
    async fn test_stream_ends_after_finish() {
        let events = decode_events(
            payloads(vec![
                Ok(r#"{"choices":[{"delta":{"content":"a"}}]}"#),
                Ok("[DONE]"),
                Ok(r#"{"choices":[{"delta":{"content":"b"}}]}"#),
            ]),
            DecoderOptions::default(),
        );

        let collected: Vec<_> = events.collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_ref().unwrap(), &DeltaEvent::text("a"));
        assert!(collected[1].as_ref().unwrap().is_finish);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let events = decode_events(
            payloads(vec![
                Ok(r#"{"choices":[{"delta":{"content":"a"}}]}"#),
                Err(StreamError::transport("connection reset")),
                Ok("[DONE]"),
            ]),
            DecoderOptions::default(),
        );

        let collected: Vec<_> = events.collect().await;
        assert_eq!(collected.len(), 2);
        assert!(matches!(collected[1], Err(StreamError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_unterminated_stream() {
        let events = decode_events(
            payloads(vec![Ok(r#"{"choices":[{"delta":{"content":"partial"}}]}"#)]),
            DecoderOptions::default(),
        );

        let collected: Vec<_> = events.collect().await;
        assert_eq!(collected.len(), 1);
        assert!(!collected[0].as_ref().unwrap().is_finish);
    }
}
