use serde::{Deserialize, Serialize};
use std::sync::Arc;

use parley_llm::{ChatMessage, Role};

use crate::attachments::{NoAttachments, SharedAttachmentResolver};
use crate::error::{ContextError, Result};
use crate::tokenizer::{HeuristicTokenCounter, SharedTokenCounter};

/// One message of the local conversation history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    #[serde(default)]
    pub text: String,
    pub is_user: bool,
    /// Placeholder for a response still streaming in
    #[serde(default)]
    pub is_loading: bool,
    /// Attachment references, only meaningful on user turns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            ..Self::default()
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            ..Self::default()
        }
    }

    /// In-flight assistant placeholder
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn with_attachment(mut self, reference: impl Into<String>) -> Self {
        self.attachments.push(reference.into());
        self
    }

    fn role(&self) -> Role {
        if self.is_user {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// History turns selected for an outbound request, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowResult {
    pub messages: Vec<ChatMessage>,
}

impl WindowResult {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Number of history turns scanned, newest first. Skipped turns count too.
    pub max_turns: usize,

    /// Most recent entries left out of the scan (the in-flight response slot)
    #[serde(default = "default_reserved_tail")]
    pub reserved_tail: usize,

    /// Newest index the scan may start from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
}

fn default_reserved_tail() -> usize {
    1
}

impl WindowOptions {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            reserved_tail: default_reserved_tail(),
            start: None,
        }
    }

    pub fn reserved_tail(mut self, reserved: usize) -> Self {
        self.reserved_tail = reserved;
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }
}

/// Selects how much of the conversation history is sent upstream
#[derive(Clone)]
pub struct HistoryWindower {
    options: WindowOptions,
    counter: SharedTokenCounter,
    resolver: SharedAttachmentResolver,
}

impl HistoryWindower {
    pub fn new(options: WindowOptions) -> Self {
        Self {
            options,
            counter: Arc::new(HeuristicTokenCounter::default()),
            resolver: Arc::new(NoAttachments),
        }
    }

    pub fn with_counter(mut self, counter: SharedTokenCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_resolver(mut self, resolver: SharedAttachmentResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn counter(&self) -> &SharedTokenCounter {
        &self.counter
    }

    /// Walk the history from newest to oldest and collect sendable turns.
    ///
    /// Attachments are resolved one turn at a time, so the result does not
    /// depend on storage latency.
    pub async fn select_window(&self, history: &[ConversationTurn]) -> WindowResult {
        let mut top = history.len().saturating_sub(self.options.reserved_tail);
        if let Some(start) = self.options.start {
            top = top.min(start.saturating_add(1));
        }

        let mut messages = Vec::new();
        let mut scanned = 0usize;

        for turn in history[..top].iter().rev() {
            if scanned >= self.options.max_turns {
                break;
            }
            scanned += 1;

            if turn.is_loading {
                continue;
            }
            if turn.text.trim().is_empty() {
                continue;
            }

            let mut content = turn.text.clone();
            if turn.is_user {
                if let Some(reference) = turn.attachments.first() {
                    match self.attachment_urls(reference).await {
                        Ok(urls) if !urls.is_empty() => {
                            content = format!("{} {}", urls.join(" "), content);
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!("Skipping attachment enrichment: {}", e),
                    }
                }
            }

            messages.push(ChatMessage::new(turn.role(), content));
        }

        messages.reverse();
        tracing::debug!(scanned, selected = messages.len(), "History window selected");

        WindowResult { messages }
    }

    async fn attachment_urls(&self, reference: &str) -> Result<Vec<String>> {
        let raw = self
            .resolver
            .resolve(reference)
            .await
            .map_err(|e| ContextError::AttachmentUnavailable {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;

        let entries: Vec<String> = serde_json::from_str(&raw)?;
        Ok(entries.into_iter().filter(|entry| entry.contains("http")).collect())
    }
}
