//! Token counting.
//!
//! The tiktoken encoder is loaded once per process. Call [`init`] at startup
//! to pay the load cost up front; counters created later share the same
//! instance.

use std::sync::{Arc, OnceLock};
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::error::{ContextError, Result};
use parley_llm::ChatMessage;

static CL100K: OnceLock<CoreBPE> = OnceLock::new();

/// Load the shared `cl100k_base` encoder (no-op after the first success)
pub fn init() -> Result<&'static CoreBPE> {
    if let Some(bpe) = CL100K.get() {
        return Ok(bpe);
    }

    let bpe = cl100k_base().map_err(|e| ContextError::Tokenizer(e.to_string()))?;
    tracing::debug!("Loaded cl100k_base encoder");
    Ok(CL100K.get_or_init(|| bpe))
}

/// Message framing rules of a chat model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFamily {
    Gpt35Turbo,
    Gpt4,
}

impl ChatFamily {
    pub fn for_model(model: &str) -> Self {
        if model.contains("gpt-4") {
            Self::Gpt4
        } else {
            Self::Gpt35Turbo
        }
    }

    /// Overhead tokens wrapped around every message
    pub fn tokens_per_message(&self) -> usize {
        match self {
            Self::Gpt35Turbo => 4,
            Self::Gpt4 => 3,
        }
    }

    /// Tokens priming the assistant reply
    pub fn reply_priming(&self) -> usize {
        3
    }
}

/// Pluggable token counter. Implementations must be pure.
pub trait TokenCounter: Send + Sync {
    fn count_text(&self, text: &str) -> usize;

    /// Tokens of a chat transcript, including per-message framing
    fn count_chat(&self, messages: &[ChatMessage], family: ChatFamily) -> usize {
        if messages.is_empty() {
            return 0;
        }

        let body: usize = messages
            .iter()
            .map(|m| {
                family.tokens_per_message() + self.count_text(m.role.as_str()) + self.count_text(&m.content)
            })
            .sum();

        body + family.reply_priming()
    }
}

pub type SharedTokenCounter = Arc<dyn TokenCounter>;

/// BPE counter backed by the shared `cl100k_base` encoder
#[derive(Clone, Copy)]
pub struct TiktokenCounter {
    bpe: &'static CoreBPE,
}

impl TiktokenCounter {
    pub fn new() -> Result<Self> {
        Ok(Self { bpe: init()? })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Character-based estimate (about four characters per token)
#[derive(Debug, Clone)]
pub struct HeuristicTokenCounter {
    chars_per_token: usize,
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

impl HeuristicTokenCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_text(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiktoken_counts() {
        let counter = TiktokenCounter::new().unwrap();
        assert_eq!(counter.count_text(""), 0);
        assert_eq!(counter.count_text("hello world"), 2);
    }

    #[test]
    fn test_init_is_shared() {
        let first = init().unwrap() as *const CoreBPE;
        let second = init().unwrap() as *const CoreBPE;
        assert_eq!(first, second);
    }

    #[test]
    fn test_chat_framing() {
        let counter = HeuristicTokenCounter::default();
        let messages = vec![ChatMessage::user("abcd"), ChatMessage::assistant("abcdefgh")];

        // user: 3 + 1 + 1, assistant: 3 + 3 + 2, priming: 3
        assert_eq!(counter.count_chat(&messages, ChatFamily::Gpt4), 16);
        assert_eq!(counter.count_chat(&messages, ChatFamily::Gpt35Turbo), 18);
        assert_eq!(counter.count_chat(&[], ChatFamily::Gpt4), 0);
    }

    #[test]
    fn test_chat_count_exceeds_flat_sum() {
        let counter = TiktokenCounter::new().unwrap();
        let messages = vec![ChatMessage::user("hello world")];
        assert!(counter.count_chat(&messages, ChatFamily::Gpt4) > counter.count_text("hello world"));
    }

    #[test]
    fn test_family_for_model() {
        assert_eq!(ChatFamily::for_model("gpt-4-turbo"), ChatFamily::Gpt4);
        assert_eq!(ChatFamily::for_model("claude-3-opus"), ChatFamily::Gpt35Turbo);
    }

    #[test]
    fn test_heuristic_rounds_up() {
        let counter = HeuristicTokenCounter::default();
        assert_eq!(counter.count_text(""), 0);
        assert_eq!(counter.count_text("abc"), 1);
        assert_eq!(counter.count_text("abcde"), 2);
    }
}
