use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Attachment {reference} could not be resolved: {message}")]
    AttachmentUnavailable { reference: String, message: String },

    #[error("Attachment payload is not a JSON string array: {0}")]
    AttachmentFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ContextError>;
