//! Publish/subscribe fan-out engine for a read-only ledger replica.
//!
//! Client sessions subscribe to streams — closed ledgers, validated and
//! proposed transactions, forwarded manifests and validations, per-account
//! and per-book transaction filters, and aggregated book changes. When the
//! upstream applier hands the engine a freshly closed ledger, the engine
//! computes which sessions must receive which payloads and dispatches them,
//! exactly once per subscribed session per matching stream.
//!
//! ## Architecture
//!
//! ```text
//! ledger applier ──► FeedEngine ──► SubscriptionRegistry (DashMap sets)
//!                        │                    │
//!                        ▼                    ▼
//!                  payload shaping      live-session snapshots
//!                        │                    │
//!                        └───► FeedExecutor ──► session.send(shared payload)
//! ```
//!
//! The registry holds only weak handles to sessions, so a session dropping
//! its connection is observable without coordination; dead handles are
//! pruned lazily on the next mutation or snapshot that meets them.

pub mod book_changes;
pub mod engine;
pub mod error;
pub mod executor;
pub mod payload;
pub mod registry;
pub mod session;
pub mod subscription;

pub use book_changes::BookChange;
pub use engine::FeedEngine;
pub use error::{FeedError, Result};
pub use executor::FeedExecutor;
pub use registry::SubscriptionRegistry;
pub use session::{session_id, FeedSession, SessionHandle, SessionId};
pub use subscription::{KeyedSubscriptions, SubscriptionSet};
