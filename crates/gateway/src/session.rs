//! WebSocket-backed feed sessions.

use axum::extract::ws::Message;
use feed::FeedSession;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// State for a single connected client. The feed registry holds only weak
/// handles to this, so dropping the last `Arc` (when the socket loop ends)
/// is all the cleanup a disconnect needs.
pub struct WsSession {
    /// Connection id, for logs only.
    pub id: Uuid,
    /// Channel to the connection's writer task.
    tx: mpsc::UnboundedSender<Message>,
    api_version: AtomicU32,
}

impl WsSession {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            tx,
            api_version: AtomicU32::new(1),
        })
    }

    /// Set the payload shape version for this session.
    pub fn set_api_version(&self, version: u32) {
        self.api_version.store(version, Ordering::Relaxed);
    }

    /// Enqueue a control-plane reply (subscribed/pong/error).
    pub fn reply(&self, reply: &crate::protocol::ServerReply) -> crate::error::Result<()> {
        let json = serde_json::to_string(reply)?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| crate::error::GatewayError::ChannelSend)
    }

    /// Raw enqueue used by the socket loop (pings, pongs).
    pub fn enqueue(&self, message: Message) -> crate::error::Result<()> {
        self.tx
            .send(message)
            .map_err(|_| crate::error::GatewayError::ChannelSend)
    }
}

impl FeedSession for WsSession {
    fn send(&self, payload: Arc<String>) {
        // The writer owns its own FIFO; a closed channel just means the
        // connection is going away and the registry will prune us.
        if self
            .tx
            .send(Message::Text(payload.as_str().to_owned().into()))
            .is_err()
        {
            debug!(session = %self.id, "dropping payload for closed session");
        }
    }

    fn api_sub_version(&self) -> u32 {
        self.api_version.load(Ordering::Relaxed)
    }
}
