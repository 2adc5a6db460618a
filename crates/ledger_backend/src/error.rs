//! Backend error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The store could not be reached or answered out of order. Transient;
    /// callers retry or surface it without tearing anything down.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes failed to decode.
    #[error("corrupt ledger object: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
