//! Read interface to the replica's ledger store.
//!
//! The feed engine consumes exactly three queries: the validated range, a
//! ledger header by sequence, and a state object by key as of a sequence.
//! Real deployments back this with the persistent store; tests and the demo
//! binary use the in-memory implementation.

pub mod error;
pub mod memory;

pub use error::{BackendError, Result};
pub use memory::MemoryBackend;

use async_trait::async_trait;
use ledger_model::{LedgerHeader, LedgerRange, ObjectKey};

/// Narrow, read-only view of the ledger store.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// The contiguous validated ledger range, or `None` while the replica
    /// has not yet loaded a complete ledger.
    async fn range(&self) -> Result<Option<LedgerRange>>;

    /// Header of the ledger with the given sequence.
    async fn ledger_by_sequence(&self, sequence: u32) -> Result<Option<LedgerHeader>>;

    /// Bytes of the state object at `key`, as of `sequence`.
    async fn ledger_object(&self, key: &ObjectKey, sequence: u32) -> Result<Option<Vec<u8>>>;
}
