//! Session handles.
//!
//! The registry never owns sessions. A handle pairs a weak reference with
//! the session's stable address, captured at construction; identity,
//! equality and hashing all follow that address, so a handle to a dead
//! session still identifies it while never delivering to it.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// A client session as the feed engine sees it: a best-effort payload sink
/// plus the API version its payloads should be shaped for.
pub trait FeedSession: Send + Sync {
    /// Enqueue one shared payload for transmission. Must never block the
    /// caller; back-pressure is the session's own policy.
    fn send(&self, payload: Arc<String>);

    /// Selects payload shape variants (e.g. `DeliverMax` handling on
    /// payment transactions).
    fn api_sub_version(&self) -> u32 {
        1
    }
}

/// Stable identity of a session: its address.
pub type SessionId = usize;

/// The identity a live session would have as a [`SessionHandle`].
pub fn session_id(session: &Arc<dyn FeedSession>) -> SessionId {
    Arc::as_ptr(session) as *const () as SessionId
}

/// Non-owning, observable reference to a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    session: Weak<dyn FeedSession>,
}

impl SessionHandle {
    pub fn new(session: &Arc<dyn FeedSession>) -> Self {
        Self {
            id: session_id(session),
            session: Arc::downgrade(session),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session, if it is still reachable.
    pub fn upgrade(&self) -> Option<Arc<dyn FeedSession>> {
        self.session.upgrade()
    }

    pub fn is_live(&self) -> bool {
        self.session.strong_count() > 0
    }

    /// Best-effort send; a dead session is a silent no-op.
    pub fn send(&self, payload: &Arc<String>) {
        if let Some(session) = self.upgrade() {
            session.send(Arc::clone(payload));
        }
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

impl Hash for SessionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
