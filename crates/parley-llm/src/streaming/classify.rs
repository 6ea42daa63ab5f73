//! Classifiers for payloads that are not valid JSON.
//!
//! The decoder applies them in a fixed order: auth failure, embedded
//! multi-line block, technical fragment. Reordering them would let plain-text
//! auth errors leak into the transcript.

use regex::Regex;
use std::sync::LazyLock;

use super::chunk::DATA_PREFIX;

static AUTH_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)FAILED_TO_AUTH|unauthorized|未认证|认证失败|invalid\s*api\s*key")
        .expect("auth failure pattern is valid")
});

/// Substrings that only show up in (truncated) completion chunks
const TECHNICAL_MARKERS: [&str; 5] = [
    "chatcmpl-",
    "chat.completion.chunk",
    "\"id\"",
    "\"object\"",
    "\"choices\"",
];

/// Plain-text authentication failure from the backend or a proxy
pub fn is_auth_failure(text: &str) -> bool {
    AUTH_FAILURE.is_match(text)
}

/// Several raw SSE lines delivered as one event
pub fn is_embedded_block(text: &str) -> bool {
    text.contains(DATA_PREFIX) && text.contains('\n')
}

/// Fragment of a completion chunk split across transport boundaries
pub fn is_technical(text: &str) -> bool {
    TECHNICAL_MARKERS.iter().any(|marker| text.contains(marker))
}
