// HTTP streaming client for the chat service

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::buffer_utils::parse_sse_stream;
use crate::config::ServerConfig;
use crate::error::StreamError;
use crate::streaming::{decode_events, DecoderOptions, DeltaStream};
use crate::traits::{ChatClient, ChatCompletionBody, ChatRequest};

/// Endpoint of the streaming completion call
pub const CHAT_SEND_PATH: &str = "/chat/send";

const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// Chat client speaking SSE over plain HTTP
#[derive(Clone)]
pub struct SseChatClient {
    http_client: reqwest::Client,
    server: ServerConfig,
    decoder: DecoderOptions,
}

impl SseChatClient {
    pub fn new(server: ServerConfig) -> Result<Self> {
        let server = server.normalized();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if !server.api_token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", server.api_token))
                    .context("Invalid API token format")?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            server,
            decoder: DecoderOptions::default(),
        })
    }

    pub fn with_decoder_options(mut self, options: DecoderOptions) -> Self {
        self.decoder = options;
        self
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }
}

impl ChatClient for SseChatClient {
    fn chat_stream(&self, request: ChatRequest) -> DeltaStream {
        let http_client = self.http_client.clone();
        let url = self.server.url(CHAT_SEND_PATH);

        let payloads = async_stream::stream! {
            let body = ChatCompletionBody::from(&request);
            tracing::info!(
                model = %request.settings.model,
                messages = request.messages.len(),
                "Sending streaming chat request"
            );

            let response = match http_client
                .post(&url)
                .header(CONTENT_TYPE, JSON_UTF8)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    yield Err(StreamError::transport(format!("Failed to send request: {}", e)));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                yield Err(StreamError::Transport {
                    status: Some(status.as_u16()),
                    message: error_text,
                });
                return;
            }

            let mut events = parse_sse_stream(response);
            while let Some(item) = events.next().await {
                yield item;
            }
        };

        decode_events(payloads, self.decoder.clone())
    }
}
