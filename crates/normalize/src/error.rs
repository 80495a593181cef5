use thiserror::Error;

pub type Result<T> = std::result::Result<T, NormalizeError>;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Invalid CRUD action for {service} -> {table}: {reason}")]
    InvalidAction {
        service: String,
        table: String,
        reason: String,
    },

    /// `raw_response` is already PII-masked
    #[error("Structured output did not match the action schema: {reason}")]
    StructuredOutput { reason: String, raw_response: String },

    #[error("Structured output client failed: {0}")]
    Client(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
