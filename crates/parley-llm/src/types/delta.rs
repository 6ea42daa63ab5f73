use serde::{Deserialize, Serialize};

/// Unit of decoder output: a piece of assistant text, or the end of the stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaEvent {
    pub text: String,
    pub is_finish: bool,
}

impl DeltaEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_finish: false,
        }
    }

    /// Terminal event with no content
    pub fn finish() -> Self {
        Self {
            text: String::new(),
            is_finish: true,
        }
    }
}
