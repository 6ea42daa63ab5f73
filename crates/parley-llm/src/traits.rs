use futures::stream::{self, AbortHandle};
use serde::Serialize;

use crate::config::ChatSettings;
use crate::streaming::DeltaStream;
use crate::types::ChatMessage;

/// Streaming chat completion.
///
/// The returned stream is lazy: no request is sent until it is first polled.
/// It yields deltas in order and ends after the terminal item.
pub trait ChatClient: Send + Sync {
    fn chat_stream(&self, request: ChatRequest) -> DeltaStream;

    /// Same as [`ChatClient::chat_stream`], plus a handle that stops the
    /// stream without producing an error item
    fn chat_stream_abortable(&self, request: ChatRequest) -> (DeltaStream, AbortHandle) {
        let (events, handle) = stream::abortable(self.chat_stream(request));
        (Box::pin(events), handle)
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub settings: ChatSettings,
    pub messages: Vec<ChatMessage>,
    pub options: RequestOptions,
}

impl ChatRequest {
    pub fn new(settings: ChatSettings, messages: Vec<ChatMessage>) -> Self {
        Self {
            settings,
            messages,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Backend-specific request fields
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub kid: Option<String>,
    pub chat_type: Option<i32>,
    pub app_id: Option<String>,
    pub has_attachment: Option<bool>,
    pub auto_select_model: Option<bool>,
    pub session_id: Option<i64>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn chat_type(mut self, chat_type: i32) -> Self {
        self.chat_type = Some(chat_type);
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn has_attachment(mut self, has_attachment: bool) -> Self {
        self.has_attachment = Some(has_attachment);
        self
    }

    pub fn auto_select_model(mut self, auto: bool) -> Self {
        self.auto_select_model = Some(auto);
        self
    }

    pub fn session_id(mut self, session_id: i64) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// JSON body of `POST /chat/send`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody<'a> {
    pub max_tokens: u32,
    pub model: &'a str,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<i32>,
    #[serde(rename = "appId", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<&'a str>,
    #[serde(rename = "hasAttachment", skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<bool>,
    #[serde(rename = "autoSelectModel", skip_serializing_if = "Option::is_none")]
    pub auto_select_model: Option<bool>,
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

impl<'a> From<&'a ChatRequest> for ChatCompletionBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        let settings = &request.settings;
        let options = &request.options;
        Self {
            max_tokens: settings.max_tokens,
            model: &settings.model,
            temperature: settings.temperature,
            top_p: settings.top_p,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            messages: &request.messages,
            stream: true,
            kid: options.kid.as_deref(),
            chat_type: options.chat_type,
            app_id: options.app_id.as_deref(),
            has_attachment: options.has_attachment,
            auto_select_model: options.auto_select_model,
            conversation_id: settings.conversation_id.as_deref(),
            session_id: options.session_id,
        }
    }
}
