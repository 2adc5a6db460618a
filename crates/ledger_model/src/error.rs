//! Model error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A field that should hold an amount held something else.
    #[error("malformed amount: {0}")]
    BadAmount(String),

    /// A JSON value did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
