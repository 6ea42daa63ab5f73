use serde_json::Value;
use thiserror::Error;

/// Failures that end a decode session and reach the caller
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// Connection failure, or the server answered with a non-2xx status
    #[error("Transport error{}: {}", fmt_status(status), message)]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The server sent a structured error object instead of content
    #[error("Upstream error: {0}")]
    Upstream(Value),

    /// Authentication failure reported as plain text
    #[error("Authentication failed: {reason}")]
    Auth { reason: String },
}

impl StreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
            || matches!(self, Self::Transport { status: Some(401), .. })
    }

    /// JSON payload handed to the UI for diagnostic display
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Upstream(value) => value.clone(),
            Self::Auth { reason } => serde_json::json!({ "reason": reason }),
            Self::Transport { status, message } => serde_json::json!({
                "status": status,
                "message": message,
            }),
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_payload() {
        let err = StreamError::Auth {
            reason: "unauthorized".to_string(),
        };
        assert_eq!(err.to_payload(), serde_json::json!({"reason": "unauthorized"}));
        assert!(err.is_auth());
    }

    #[test]
    fn test_transport_display() {
        let err = StreamError::Transport {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Transport error (502): bad gateway");
        assert_eq!(StreamError::transport("reset").to_string(), "Transport error: reset");
    }
}
