use serde::{Deserialize, Serialize};

use parley_llm::{ChatMessage, ChatSettings};

use crate::model_limits::{model_max_context_k, TOKENS_PER_K};
use crate::templates::system_prompt;
use crate::tokenizer::{ChatFamily, TokenCounter};
use crate::window::{ConversationTurn, HistoryWindower};

/// Token usage of a pending request against the model's context size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReport {
    pub system: usize,
    pub input: usize,
    pub history: usize,
    /// Negative when the conversation is over budget
    pub remain: i64,
    /// Context size label, e.g. `"32k"`
    pub model_tokens: String,
    /// Tokens reserved for the response
    pub plan_outer: u32,
}

impl TokenReport {
    pub fn is_over_budget(&self) -> bool {
        self.remain < 0
    }
}

/// Context left after the prompt parts and the response reservation
pub fn remaining_budget(
    max_context_k: u32,
    system: usize,
    input: usize,
    history: usize,
    max_response: u32,
) -> i64 {
    i64::from(max_context_k) * TOKENS_PER_K
        - history as i64
        - i64::from(max_response)
        - input as i64
        - system as i64
}

/// Token report for a window that has already been selected
pub fn report_for_window(
    counter: &dyn TokenCounter,
    window: &[ChatMessage],
    input: &str,
    settings: &ChatSettings,
) -> TokenReport {
    let max_k = model_max_context_k(&settings.model);
    let system = counter.count_text(&system_prompt(settings));
    let input = counter.count_text(input);
    let history = counter.count_chat(window, ChatFamily::for_model(&settings.model));

    TokenReport {
        system,
        input,
        history,
        remain: remaining_budget(max_k, system, input, history, settings.max_tokens),
        model_tokens: format!("{}k", max_k),
        plan_outer: settings.max_tokens,
    }
}

/// Window the history and report how much of the model's context it uses.
///
/// Nothing is truncated here; callers decide what to do with a negative
/// `remain`.
pub async fn count_tokens(
    windower: &HistoryWindower,
    history: &[ConversationTurn],
    input: &str,
    settings: &ChatSettings,
) -> TokenReport {
    let window = windower.select_window(history).await;
    let report = report_for_window(windower.counter().as_ref(), &window.messages, input, settings);

    if report.is_over_budget() {
        tracing::warn!(
            model = %settings.model,
            remain = report.remain,
            "Conversation exceeds the model context"
        );
    }

    report
}
