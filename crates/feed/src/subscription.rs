//! Subscription sets and keyed subscription maps.
//!
//! One `SubscriptionSet` per unkeyed stream; keyed streams (per-account,
//! per-book) hold one set per key inside a `KeyedSubscriptions` map. Sets
//! store weak handles keyed by session identity; dead handles are pruned by
//! whichever mutation or snapshot meets them first.

use crate::session::{session_id, FeedSession, SessionHandle, SessionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Thread-safe set of session handles for one topic.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: DashMap<SessionId, SessionHandle>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Returns `true` if it was not already present by
    /// identity; a dead leftover under the same identity is replaced.
    pub fn add(&self, session: &Arc<dyn FeedSession>) -> bool {
        let handle = SessionHandle::new(session);
        match self.entries.entry(handle.id()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_live() {
                    false
                } else {
                    slot.insert(handle);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Remove a session by identity. Returns `true` if it was present.
    pub fn remove(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.remove_id(session_id(session))
    }

    pub fn remove_id(&self, id: SessionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Snapshot the live sessions, pruning every dead handle met on the
    /// way. Callers deliver outside any set lock.
    pub fn live_sessions(&self) -> Vec<Arc<dyn FeedSession>> {
        let mut live = Vec::new();
        self.entries.retain(|_, handle| match handle.upgrade() {
            Some(session) => {
                live.push(session);
                true
            }
            None => false,
        });
        live
    }

    /// Invoke `f` for every live session, pruning dead handles.
    pub fn for_each_live(&self, mut f: impl FnMut(&Arc<dyn FeedSession>)) {
        for session in self.live_sessions() {
            f(&session);
        }
    }

    /// Number of live sessions. Prunes as a side effect.
    pub fn live_count(&self) -> usize {
        self.live_sessions().len()
    }

    /// True when no entries remain at all (live or dead).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every handle.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Map from a topic key to its subscription set. A key is present iff its
/// set is non-empty; unsubscribing the last session deletes the key.
#[derive(Debug)]
pub struct KeyedSubscriptions<K: Eq + Hash + Clone> {
    sets: DashMap<K, Arc<SubscriptionSet>>,
}

impl<K: Eq + Hash + Clone> Default for KeyedSubscriptions<K> {
    fn default() -> Self {
        Self { sets: DashMap::new() }
    }
}

impl<K: Eq + Hash + Clone> KeyedSubscriptions<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, key: K, session: &Arc<dyn FeedSession>) -> bool {
        let set = self
            .sets
            .entry(key)
            .or_insert_with(|| Arc::new(SubscriptionSet::new()))
            .clone();
        set.add(session)
    }

    pub fn unsubscribe(&self, key: &K, session: &Arc<dyn FeedSession>) -> bool {
        let Some(set) = self.sets.get(key).map(|entry| entry.value().clone()) else {
            return false;
        };
        let removed = set.remove(session);
        if set.is_empty() {
            self.sets.remove_if(key, |_, set| set.is_empty());
        }
        removed
    }

    /// Live sessions subscribed under `key`.
    pub fn live_sessions(&self, key: &K) -> Vec<Arc<dyn FeedSession>> {
        match self.sets.get(key).map(|entry| entry.value().clone()) {
            Some(set) => set.live_sessions(),
            None => Vec::new(),
        }
    }

    /// Sum of live counts across all keys. Keys whose sets have emptied out
    /// (e.g. every subscriber died) are dropped on the way.
    pub fn live_count(&self) -> usize {
        let mut total = 0;
        self.sets.retain(|_, set| {
            total += set.live_count();
            !set.is_empty()
        });
        total
    }

    pub fn key_count(&self) -> usize {
        self.sets.len()
    }

    /// Drop every key and handle.
    pub fn clear(&self) {
        self.sets.clear();
    }
}
