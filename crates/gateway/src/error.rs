//! Gateway error types.

use thiserror::Error;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feed engine error, surfaced to the client that caused it.
    #[error(transparent)]
    Feed(#[from] feed::FeedError),

    /// A subscribe command named an invalid key.
    #[error("invalid subscription target: {0}")]
    InvalidTarget(String),

    /// The session's outbound channel is gone.
    #[error("session channel closed")]
    ChannelSend,
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
