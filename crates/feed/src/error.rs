//! Feed error types.
//!
//! Nothing here is fatal to the engine: backend failures surface to the
//! caller of the one suspending operation, shaping failures drop the single
//! affected payload, and everything else is pruned or ignored silently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The ledger store failed while answering a subscribe-time read.
    #[error(transparent)]
    Backend(#[from] ledger_backend::BackendError),

    /// The replica holds no complete ledger yet.
    #[error("no validated ledger range is available")]
    NoLedgerRange,

    /// The range named a ledger the store could not produce.
    #[error("missing ledger header for sequence {0}")]
    MissingLedger(u32),

    /// A payload could not be shaped from its inputs.
    #[error("malformed payload input: {0}")]
    Shape(String),

    /// A model value failed to decode.
    #[error(transparent)]
    Model(#[from] ledger_model::ModelError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The registry has been shut down and refuses new subscriptions.
    #[error("subscription registry is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, FeedError>;
