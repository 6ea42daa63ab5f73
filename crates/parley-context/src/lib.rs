pub mod error;
pub mod model_limits;
pub mod tokenizer;
pub mod attachments;
pub mod window;
pub mod budget;
pub mod templates;

pub use attachments::{AttachmentResolver, InMemoryAttachments, NoAttachments, SharedAttachmentResolver};
pub use budget::{count_tokens, remaining_budget, report_for_window, TokenReport};
pub use error::{ContextError, Result};
pub use model_limits::{model_max_context_k, DEFAULT_CONTEXT_K, TOKENS_PER_K};
pub use templates::{render_system_prompt, system_prompt, with_system_message, DEFAULT_SYSTEM_TEMPLATE};
pub use tokenizer::{
    ChatFamily, HeuristicTokenCounter, SharedTokenCounter, TiktokenCounter, TokenCounter,
};
pub use window::{ConversationTurn, HistoryWindower, WindowOptions, WindowResult};
