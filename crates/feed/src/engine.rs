//! The feed engine: subscription surface plus publication dispatch.
//!
//! Subscribe/unsubscribe calls may arrive from any session worker;
//! publication calls arrive from the single ledger-applier context. Payloads
//! are shaped once, shared behind `Arc<String>`, and delivered through the
//! executor so no registry lock is ever held across a send.

use crate::book_changes;
use crate::error::{FeedError, Result};
use crate::executor::FeedExecutor;
use crate::payload;
use crate::registry::SubscriptionRegistry;
use crate::session::{session_id, FeedSession, SessionId};
use ledger_backend::LedgerBackend;
use ledger_model::{
    fee_settings_key, AccountId, Book, FeeSettings, LedgerHeader, TransactionAndMetadata,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide pub/sub engine. Constructed once at start-up and injected
/// wherever sessions or the applier need it.
pub struct FeedEngine {
    registry: SubscriptionRegistry,
    backend: Arc<dyn LedgerBackend>,
    executor: FeedExecutor,
}

impl FeedEngine {
    pub fn new(backend: Arc<dyn LedgerBackend>, executor: FeedExecutor) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            backend,
            executor,
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn report(&self) -> Value {
        self.registry.report()
    }

    /// Subscribe to the ledger stream and describe the current ledger
    /// window and fee schedule. A backend failure surfaces as the error
    /// value, but the subscription is installed regardless, so subsequent
    /// closed-ledger messages still reach the session.
    pub async fn sub_ledger(&self, session: &Arc<dyn FeedSession>) -> Result<Value> {
        if self.registry.is_closed() {
            return Err(FeedError::ShutDown);
        }
        self.registry.sub_ledger(session);

        let range = self
            .backend
            .range()
            .await?
            .ok_or(FeedError::NoLedgerRange)?;
        let header = self
            .backend
            .ledger_by_sequence(range.max)
            .await?
            .ok_or(FeedError::MissingLedger(range.max))?;
        let fees = match self
            .backend
            .ledger_object(&fee_settings_key(), range.max)
            .await?
        {
            Some(bytes) => FeeSettings::from_bytes(&bytes)?,
            None => FeeSettings::default(),
        };
        Ok(payload::ledger_subscribe_response(
            &header,
            &fees,
            &range.to_validated_string(),
        ))
    }

    /// Publish a closed ledger to the ledger stream.
    pub fn pub_ledger(
        &self,
        header: &LedgerHeader,
        fees: &FeeSettings,
        validated_ledgers: &str,
        txn_count: usize,
    ) {
        let message = Arc::new(
            payload::ledger_closed(header, fees, validated_ledgers, txn_count).to_string(),
        );
        let sessions = self.registry.ledger.live_sessions();
        debug!(sequence = header.sequence, fanout = sessions.len(), "publishing ledgerClosed");
        self.deliver(sessions.into_iter().map(|s| (s, Arc::clone(&message))));
    }

    /// Publish one validated transaction.
    ///
    /// Candidate sessions are gathered from the `transactions` stream, then
    /// from `account(A)` for every affected account, then from `book(B)`
    /// for every touched book — in that order — and deduplicated by session
    /// identity, so a session subscribed to any overlapping combination
    /// receives exactly one copy. Proposed streams are not touched here.
    pub fn pub_transaction(&self, tx: &TransactionAndMetadata, header: &LedgerHeader) {
        let v1 = match payload::transaction(tx, header, 1) {
            Ok(value) => Arc::new(value.to_string()),
            Err(err) => {
                warn!(tx_hash = %tx.hash, %err, "dropping unshapeable transaction payload");
                return;
            }
        };
        // v2 is shaped on first demand.
        let mut v2: Option<Arc<String>> = None;

        let mut candidates: Vec<Arc<dyn FeedSession>> =
            self.registry.transactions.live_sessions();
        for account in tx.affected_accounts() {
            candidates.extend(self.registry.accounts.live_sessions(&account));
        }
        for book in tx.touched_books() {
            candidates.extend(self.registry.books.live_sessions(&book));
        }

        let mut seen: HashSet<SessionId> = HashSet::with_capacity(candidates.len());
        let mut deliveries = Vec::new();
        for session in candidates {
            if !seen.insert(session_id(&session)) {
                continue;
            }
            let message = if session.api_sub_version() >= 2 {
                match &v2 {
                    Some(message) => Arc::clone(message),
                    None => match payload::transaction(tx, header, 2) {
                        Ok(value) => {
                            let message = Arc::new(value.to_string());
                            v2 = Some(Arc::clone(&message));
                            message
                        }
                        Err(err) => {
                            warn!(tx_hash = %tx.hash, %err, "dropping unshapeable transaction payload");
                            continue;
                        }
                    },
                }
            } else {
                Arc::clone(&v1)
            };
            deliveries.push((session, message));
        }

        debug!(tx_hash = %tx.hash, fanout = deliveries.len(), "publishing transaction");
        self.deliver(deliveries.into_iter());
    }

    /// Aggregate a ledger's offer deltas and publish one `bookChanges`
    /// message. Empty ledgers still publish, with an empty change list.
    pub fn pub_book_changes(&self, header: &LedgerHeader, transactions: &[TransactionAndMetadata]) {
        let changes = book_changes::compute(transactions);
        let message = Arc::new(payload::book_changes(header, &changes).to_string());
        let sessions = self.registry.book_changes.live_sessions();
        debug!(sequence = header.sequence, books = changes.len(), fanout = sessions.len(), "publishing bookChanges");
        self.deliver(sessions.into_iter().map(|s| (s, Arc::clone(&message))));
    }

    /// Forward a validator manifest verbatim.
    pub fn forward_manifest(&self, obj: &Value) {
        self.forward_unkeyed(&self.registry.manifests, obj, "manifest");
    }

    /// Forward a validation verbatim.
    pub fn forward_validation(&self, obj: &Value) {
        self.forward_unkeyed(&self.registry.validations, obj, "validation");
    }

    /// Forward a proposed transaction verbatim to the proposed-transactions
    /// stream, and additionally to `account_proposed(A)` for each account
    /// discovered in the payload's `Account` and `Destination` fields.
    /// The two proposed streams deliver independently; the account fan-out
    /// dedups across its keys.
    pub fn forward_proposed_transaction(&self, obj: &Value) {
        let message = Arc::new(obj.to_string());

        let stream_sessions = self.registry.transactions_proposed.live_sessions();
        self.deliver(
            stream_sessions
                .into_iter()
                .map(|s| (s, Arc::clone(&message))),
        );

        let mut seen: HashSet<SessionId> = HashSet::new();
        let mut deliveries = Vec::new();
        for account in proposed_accounts(obj) {
            for session in self.registry.accounts_proposed.live_sessions(&account) {
                if seen.insert(session_id(&session)) {
                    deliveries.push((session, Arc::clone(&message)));
                }
            }
        }
        self.deliver(deliveries.into_iter());
    }

    /// Tear down the registry: releases every handle and refuses further
    /// subscriptions. In-flight deliveries already submitted may still run.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    fn forward_unkeyed(&self, set: &crate::subscription::SubscriptionSet, obj: &Value, kind: &str) {
        let message = Arc::new(obj.to_string());
        let sessions = set.live_sessions();
        debug!(kind, fanout = sessions.len(), "forwarding");
        self.deliver(sessions.into_iter().map(|s| (s, Arc::clone(&message))));
    }

    fn deliver(&self, deliveries: impl Iterator<Item = (Arc<dyn FeedSession>, Arc<String>)>) {
        let deliveries: Vec<_> = deliveries.collect();
        if deliveries.is_empty() {
            return;
        }
        self.executor.submit(move || {
            for (session, message) in deliveries {
                session.send(message);
            }
        });
    }
}

/// Accounts named by a forwarded proposed transaction: a flat scan of the
/// `Account` and `Destination` fields of the transaction object (nested
/// under `"transaction"` when the forwarder wraps it).
fn proposed_accounts(obj: &Value) -> Vec<AccountId> {
    let tx = obj.get("transaction").unwrap_or(obj);
    let mut accounts = Vec::new();
    for field in ["Account", "Destination"] {
        if let Some(address) = tx.get(field).and_then(Value::as_str) {
            let account = AccountId::from(address);
            if !accounts.contains(&account) {
                accounts.push(account);
            }
        }
    }
    accounts
}

// Subscription passthroughs. Kept one-to-one with the registry so callers
// hold a single engine handle.
impl FeedEngine {
    pub fn unsub_ledger(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_ledger(session)
    }

    pub fn sub_transactions(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_transactions(session)
    }

    pub fn unsub_transactions(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_transactions(session)
    }

    pub fn sub_proposed_transactions(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_proposed_transactions(session)
    }

    pub fn unsub_proposed_transactions(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_proposed_transactions(session)
    }

    pub fn sub_manifests(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_manifests(session)
    }

    pub fn unsub_manifests(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_manifests(session)
    }

    pub fn sub_validations(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_validations(session)
    }

    pub fn unsub_validations(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_validations(session)
    }

    pub fn sub_book_changes(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_book_changes(session)
    }

    pub fn unsub_book_changes(&self, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_book_changes(session)
    }

    pub fn sub_account(&self, account: AccountId, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_account(account, session)
    }

    pub fn unsub_account(&self, account: &AccountId, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_account(account, session)
    }

    pub fn sub_proposed_account(&self, account: AccountId, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_proposed_account(account, session)
    }

    pub fn unsub_proposed_account(
        &self,
        account: &AccountId,
        session: &Arc<dyn FeedSession>,
    ) -> bool {
        self.registry.unsub_proposed_account(account, session)
    }

    pub fn sub_book(&self, book: Book, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.sub_book(book, session)
    }

    pub fn unsub_book(&self, book: &Book, session: &Arc<dyn FeedSession>) -> bool {
        self.registry.unsub_book(book, session)
    }
}
