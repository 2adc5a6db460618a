//! Data model for a read-only ledger replica.
//!
//! Plain-value types shared by the storage backend and the feed engine:
//! accounts, issues and order books, amounts, ledger headers, fee settings,
//! and transactions with their application metadata. Everything here is
//! cheap to clone and carries no I/O.

pub mod account;
pub mod amount;
pub mod asset;
pub mod error;
pub mod ledger;
pub mod meta;
pub mod result;
pub mod transaction;

pub use account::AccountId;
pub use amount::Amount;
pub use asset::{Book, Issue};
pub use error::{ModelError, Result};
pub use ledger::{fee_settings_key, FeeSettings, LedgerHeader, LedgerRange, ObjectKey};
pub use meta::{AffectedNode, NodeDetails, OfferDelta, TransactionMeta};
pub use result::{result_info, ResultInfo};
pub use transaction::{TransactionAndMetadata, PARTIAL_PAYMENT_LEDGER};
