//! WebSocket gateway for the ledger feed engine.
//!
//! This service:
//! - Accepts WebSocket connections from streaming clients
//! - Maps subscribe/unsubscribe commands onto the feed registry
//! - Accepts closed ledgers and relayed objects from the upstream applier
//!   and drives the engine's publication entry points
//!
//! ## Architecture
//!
//! ```text
//! applier: POST /ingest/*
//!         ↓
//! FeedEngine (registry + dispatch)
//!         ↓
//! WsSession outbound FIFO
//!         ↓
//! WebSocket clients
//! ```

pub mod error;
pub mod ingest;
pub mod protocol;
pub mod session;
pub mod ws_server;

pub use error::{GatewayError, Result};
pub use protocol::{BookSpec, ClientCommand, IssueSpec, ServerReply, Stream};
pub use session::WsSession;
pub use ws_server::{create_router, AppState};
