//! The subscription registry.
//!
//! One set per unkeyed stream, one keyed map per keyed stream. The registry
//! is process-wide but injected: constructed once at engine start, passed
//! explicitly, and drained on shutdown, after which it refuses new
//! subscriptions.

use crate::session::FeedSession;
use crate::subscription::{KeyedSubscriptions, SubscriptionSet};
use ledger_model::{AccountId, Book};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    pub(crate) ledger: SubscriptionSet,
    pub(crate) transactions: SubscriptionSet,
    pub(crate) transactions_proposed: SubscriptionSet,
    pub(crate) manifests: SubscriptionSet,
    pub(crate) validations: SubscriptionSet,
    pub(crate) book_changes: SubscriptionSet,
    pub(crate) accounts: KeyedSubscriptions<AccountId>,
    pub(crate) accounts_proposed: KeyedSubscriptions<AccountId>,
    pub(crate) books: KeyedSubscriptions<Book>,
    closed: AtomicBool,
}

macro_rules! unkeyed_pair {
    ($sub:ident, $unsub:ident, $set:ident, $name:literal) => {
        pub fn $sub(&self, session: &Arc<dyn FeedSession>) -> bool {
            if self.is_closed() {
                return false;
            }
            let added = self.$set.add(session);
            debug!(stream = $name, added, "subscribe");
            added
        }

        pub fn $unsub(&self, session: &Arc<dyn FeedSession>) -> bool {
            let removed = self.$set.remove(session);
            debug!(stream = $name, removed, "unsubscribe");
            removed
        }
    };
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    unkeyed_pair!(sub_ledger, unsub_ledger, ledger, "ledger");
    unkeyed_pair!(sub_transactions, unsub_transactions, transactions, "transactions");
    unkeyed_pair!(
        sub_proposed_transactions,
        unsub_proposed_transactions,
        transactions_proposed,
        "transactions_proposed"
    );
    unkeyed_pair!(sub_manifests, unsub_manifests, manifests, "manifests");
    unkeyed_pair!(sub_validations, unsub_validations, validations, "validations");
    unkeyed_pair!(sub_book_changes, unsub_book_changes, book_changes, "book_changes");

    pub fn sub_account(&self, account: AccountId, session: &Arc<dyn FeedSession>) -> bool {
        if self.is_closed() {
            return false;
        }
        let added = self.accounts.subscribe(account, session);
        debug!(stream = "account", added, "subscribe");
        added
    }

    pub fn unsub_account(&self, account: &AccountId, session: &Arc<dyn FeedSession>) -> bool {
        self.accounts.unsubscribe(account, session)
    }

    pub fn sub_proposed_account(&self, account: AccountId, session: &Arc<dyn FeedSession>) -> bool {
        if self.is_closed() {
            return false;
        }
        let added = self.accounts_proposed.subscribe(account, session);
        debug!(stream = "accounts_proposed", added, "subscribe");
        added
    }

    pub fn unsub_proposed_account(
        &self,
        account: &AccountId,
        session: &Arc<dyn FeedSession>,
    ) -> bool {
        self.accounts_proposed.unsubscribe(account, session)
    }

    pub fn sub_book(&self, book: Book, session: &Arc<dyn FeedSession>) -> bool {
        if self.is_closed() {
            return false;
        }
        let added = self.books.subscribe(book, session);
        debug!(stream = "books", added, "subscribe");
        added
    }

    pub fn unsub_book(&self, book: &Book, session: &Arc<dyn FeedSession>) -> bool {
        self.books.unsubscribe(book, session)
    }

    /// Live-subscriber counts per stream; keyed streams aggregate across
    /// their keys.
    pub fn report(&self) -> Value {
        json!({
            "ledger": self.ledger.live_count(),
            "transactions": self.transactions.live_count(),
            "transactions_proposed": self.transactions_proposed.live_count(),
            "manifests": self.manifests.live_count(),
            "validations": self.validations.live_count(),
            "account": self.accounts.live_count(),
            "accounts_proposed": self.accounts_proposed.live_count(),
            "books": self.books.live_count(),
            "book_changes": self.book_changes.live_count(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release every handle and refuse further subscriptions.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        for set in [
            &self.ledger,
            &self.transactions,
            &self.transactions_proposed,
            &self.manifests,
            &self.validations,
            &self.book_changes,
        ] {
            set.clear();
        }
        self.accounts.clear();
        self.accounts_proposed.clear();
        self.books.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSession;

    impl FeedSession for NullSession {
        fn send(&self, _payload: Arc<String>) {}
    }

    #[test]
    fn shutdown_releases_handles_and_refuses_new_subscriptions() {
        let registry = SubscriptionRegistry::new();
        let session: Arc<dyn FeedSession> = Arc::new(NullSession);
        assert!(registry.sub_transactions(&session));
        assert!(registry.sub_account("rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn".into(), &session));

        registry.shutdown();
        assert_eq!(registry.report()["transactions"], 0);
        assert_eq!(registry.report()["account"], 0);
        assert!(!registry.sub_transactions(&session));
        assert!(registry.is_closed());
    }
}
