/// Context size (in thousands of tokens) assumed when nothing matches
pub const DEFAULT_CONTEXT_K: u32 = 4;

/// Tokens per "k" in the context table
pub const TOKENS_PER_K: i64 = 1024;

/// Maximum context size of a model, in thousands of tokens.
///
/// Matching is case-insensitive. Exact model names and longer size markers
/// are checked before shorter ones, so `gpt-4-128k` resolves to 128 rather
/// than tripping over the `8k` inside `128k`.
pub fn model_max_context_k(model: &str) -> u32 {
    let model = model.to_lowercase();

    if model == "gpt-4-1106-preview" || model == "gpt-4-0125-preview" || model.contains("128k") {
        return 128;
    }
    if model.contains("64k") {
        return 64;
    }
    if model.contains("32k") {
        return 32;
    }
    if model == "gpt-3.5-turbo-1106" || model == "gpt-3.5-turbo-0125" || model.contains("16k") {
        return 16;
    }
    if model.contains("8k") {
        return 8;
    }
    if model.contains("claude-3") {
        return 120;
    }
    if model.contains("gpt-4") {
        return 8;
    }

    DEFAULT_CONTEXT_K
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models() {
        assert_eq!(model_max_context_k("gpt-4-32k"), 32);
        assert_eq!(model_max_context_k("claude-3-opus"), 120);
        assert_eq!(model_max_context_k("unknown-model"), 4);
    }

    #[test]
    fn test_exact_matches() {
        assert_eq!(model_max_context_k("gpt-3.5-turbo-1106"), 16);
        assert_eq!(model_max_context_k("GPT-3.5-Turbo-0125"), 16);
        assert_eq!(model_max_context_k("gpt-4-1106-preview"), 128);
        assert_eq!(model_max_context_k("gpt-4-0125-preview"), 128);
    }

    #[test]
    fn test_most_specific_wins() {
        assert_eq!(model_max_context_k("gpt-4-128k"), 128);
        assert_eq!(model_max_context_k("moonshot-v1-8k"), 8);
        assert_eq!(model_max_context_k("deepseek-64k"), 64);
        assert_eq!(model_max_context_k("gpt-3.5-turbo-16k"), 16);
        assert_eq!(model_max_context_k("claude-3-32k"), 32);
    }

    #[test]
    fn test_family_fallbacks() {
        assert_eq!(model_max_context_k("gpt-4"), 8);
        assert_eq!(model_max_context_k("gpt-4o-mini"), 8);
        assert_eq!(model_max_context_k("Claude-3-5-Sonnet"), 120);
        assert_eq!(model_max_context_k("gpt-3.5-turbo"), 4);
    }
}
