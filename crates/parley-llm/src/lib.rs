pub mod types;
pub mod error;
pub mod config;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod client;

pub use traits::{ChatClient, ChatCompletionBody, ChatRequest, RequestOptions};

pub use client::{SseChatClient, CHAT_SEND_PATH};
pub use config::{ChatSettings, ServerConfig};
pub use error::StreamError;
pub use streaming::{
    decode_events, DecodeSession, DecoderOptions, DeltaSink, DeltaStream, FnSink, SessionState,
};
pub use types::{ChatMessage, DeltaEvent, Role};

pub use futures::stream::AbortHandle;
