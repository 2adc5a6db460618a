//! End-to-end engine scenarios against a recording session and an
//! in-memory ledger store.

use async_trait::async_trait;
use feed::{FeedEngine, FeedError, FeedExecutor, FeedSession};
use ledger_backend::{BackendError, LedgerBackend, MemoryBackend};
use ledger_model::{
    AccountId, Book, FeeSettings, Issue, LedgerHeader, LedgerRange, ObjectKey,
    TransactionAndMetadata, TransactionMeta,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const ACCOUNT1: &str = "rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn";
const ACCOUNT2: &str = "rLEsXccBGNR3UPuPu2hUXPjziKC3qKSBun";
const CURRENCY: &str = "0158415500000000C1F76FF6ECB0BAC600000000";
const ISSUER: &str = "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD";
const LEDGER_HASH: &str = "4BC50C9B0D8515D3EAAE1E74B29A95804346C491EE1A95BF25E4AAB854A6A652";

#[derive(Default)]
struct RecordingSession {
    api_version: u32,
    sent: Mutex<Vec<String>>,
}

impl RecordingSession {
    fn v1() -> Arc<Self> {
        Arc::new(Self { api_version: 1, sent: Mutex::new(Vec::new()) })
    }

    fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl FeedSession for RecordingSession {
    fn send(&self, payload: Arc<String>) {
        self.sent.lock().unwrap().push((*payload).clone());
    }

    fn api_sub_version(&self) -> u32 {
        self.api_version
    }
}

fn engine() -> FeedEngine {
    FeedEngine::new(Arc::new(MemoryBackend::new()), FeedExecutor::inline())
}

fn as_feed(session: &Arc<RecordingSession>) -> Arc<dyn FeedSession> {
    session.clone()
}

fn header(sequence: u32) -> LedgerHeader {
    LedgerHeader { sequence, hash: LEDGER_HASH.into(), close_time: 0 }
}

fn iou_issue(issuer: &str) -> Issue {
    Issue::Iou { currency: CURRENCY.into(), issuer: issuer.into() }
}

/// Payment whose metadata modifies one offer in the XRP/IOU book, with the
/// issued side issued by `issuer`.
fn payment_tx(issuer: &str) -> TransactionAndMetadata {
    let meta: TransactionMeta = serde_json::from_value(json!({
        "AffectedNodes": [
            {
                "ModifiedNode": {
                    "LedgerEntryType": "Offer",
                    "FinalFields": {
                        "TakerGets": "3",
                        "TakerPays": { "currency": CURRENCY, "issuer": issuer, "value": "1" }
                    },
                    "PreviousFields": {
                        "TakerGets": "1",
                        "TakerPays": { "currency": CURRENCY, "issuer": issuer, "value": "3" }
                    }
                }
            }
        ],
        "TransactionIndex": 22,
        "TransactionResult": "tesSUCCESS"
    }))
    .unwrap();
    TransactionAndMetadata {
        transaction: json!({
            "TransactionType": "Payment",
            "Account": ACCOUNT1,
            "Destination": ACCOUNT2,
            "Amount": "1",
            "Fee": "1",
            "Sequence": 32,
            "SigningPubKey": "74657374"
        }),
        hash: "51D2AAA6B8E4E16EF22F6424854283D8391B56875858A711B8CE4D5B9A422CC2".into(),
        ledger_sequence: 32,
        meta,
    }
}

#[test]
fn report_counts_follow_sub_unsub_and_session_death() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s2 = RecordingSession::v1();
    let account = AccountId::from(ACCOUNT1);
    let book = Book::from_offer_sides(Issue::Xrp, iou_issue(ISSUER));

    for session in [&s1, &s2] {
        let session = as_feed(session);
        engine.sub_book_changes(&session);
        engine.sub_manifests(&session);
        engine.sub_proposed_transactions(&session);
        engine.sub_transactions(&session);
        engine.sub_validations(&session);
        engine.sub_account(account.clone(), &session);
        engine.sub_proposed_account(account.clone(), &session);
        engine.sub_book(book.clone(), &session);
    }

    assert_eq!(
        engine.report(),
        json!({
            "ledger": 0,
            "transactions": 2,
            "transactions_proposed": 2,
            "manifests": 2,
            "validations": 2,
            "account": 2,
            "accounts_proposed": 2,
            "books": 2,
            "book_changes": 2
        })
    );

    let s1_feed = as_feed(&s1);
    engine.unsub_book_changes(&s1_feed);
    engine.unsub_manifests(&s1_feed);
    engine.unsub_proposed_transactions(&s1_feed);
    engine.unsub_transactions(&s1_feed);
    engine.unsub_validations(&s1_feed);
    engine.unsub_account(&account, &s1_feed);
    engine.unsub_proposed_account(&account, &s1_feed);
    engine.unsub_book(&book, &s1_feed);

    // Unsubscribing something that was never subscribed is a no-op.
    let other = AccountId::from(ACCOUNT2);
    assert!(!engine.unsub_account(&other, &s1_feed));
    assert!(!engine.unsub_proposed_account(&other, &s1_feed));

    let report = engine.report();
    for stream in [
        "transactions",
        "transactions_proposed",
        "manifests",
        "validations",
        "account",
        "accounts_proposed",
        "books",
        "book_changes",
    ] {
        assert_eq!(report[stream], 1, "stream {stream}");
    }

    drop(s2);
    let report = engine.report();
    for (stream, count) in report.as_object().unwrap() {
        assert_eq!(count, 0, "stream {stream}");
    }
}

#[test]
fn manifests_are_forwarded_until_unsubscribe() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);
    let manifest = json!({ "manifest": "test" });

    engine.sub_manifests(&s1_feed);
    engine.forward_manifest(&manifest);
    assert_eq!(s1.sent(), vec![manifest.clone()]);

    engine.unsub_manifests(&s1_feed);
    engine.forward_manifest(&manifest);
    assert_eq!(s1.sent_count(), 1);
}

#[test]
fn validations_are_forwarded_verbatim() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);
    let validation = json!({ "validation": "test" });

    engine.sub_validations(&s1_feed);
    engine.forward_validation(&validation);
    engine.unsub_validations(&s1_feed);
    engine.forward_validation(&validation);
    assert_eq!(s1.sent(), vec![validation]);
}

#[test]
fn book_changes_aggregate_one_ledger() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    engine.sub_book_changes(&as_feed(&s1));
    assert_eq!(engine.report()["book_changes"], 1);

    engine.pub_book_changes(&header(32), &[payment_tx(ISSUER)]);

    let expected = json!({
        "type": "bookChanges",
        "ledger_index": 32,
        "ledger_hash": LEDGER_HASH,
        "ledger_time": 0,
        "changes": [
            {
                "currency_a": "XRP_drops",
                "currency_b": format!("{ISSUER}/{CURRENCY}"),
                "volume_a": "2",
                "volume_b": "2",
                "high": "-1",
                "low": "-1",
                "open": "-1",
                "close": "-1"
            }
        ]
    });
    assert_eq!(s1.sent(), vec![expected]);

    engine.unsub_book_changes(&as_feed(&s1));
    assert_eq!(engine.report()["book_changes"], 0);
}

#[test]
fn empty_ledgers_still_publish_book_changes() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    engine.sub_book_changes(&as_feed(&s1));

    engine.pub_book_changes(&header(40), &[]);
    let sent = s1.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["changes"], json!([]));
}

#[tokio::test]
async fn ledger_subscribe_describes_the_current_window() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_ledger(header(10));
    backend.put_ledger(header(30));
    backend.put_fee_settings(
        30,
        &FeeSettings { base_fee: 1, reserve_base: 3, reserve_inc: 2 },
    );
    let engine = FeedEngine::new(backend, FeedExecutor::inline());

    let s1 = RecordingSession::v1();
    let response = engine.sub_ledger(&as_feed(&s1)).await.unwrap();
    assert_eq!(
        response,
        json!({
            "validated_ledgers": "10-30",
            "ledger_index": 30,
            "ledger_hash": LEDGER_HASH,
            "ledger_time": 0,
            "fee_base": 1,
            "reserve_base": 3,
            "reserve_inc": 2
        })
    );
    assert_eq!(engine.report()["ledger"], 1);

    engine.pub_ledger(
        &header(31),
        &FeeSettings { base_fee: 0, reserve_base: 10, reserve_inc: 0 },
        "10-31",
        8,
    );
    assert_eq!(
        s1.sent(),
        vec![json!({
            "type": "ledgerClosed",
            "ledger_index": 31,
            "ledger_hash": LEDGER_HASH,
            "ledger_time": 0,
            "fee_base": 0,
            "reserve_base": 10,
            "reserve_inc": 0,
            "validated_ledgers": "10-31",
            "txn_count": 8
        })]
    );

    engine.unsub_ledger(&as_feed(&s1));
    assert_eq!(engine.report()["ledger"], 0);
}

struct FailingBackend;

#[async_trait]
impl LedgerBackend for FailingBackend {
    async fn range(&self) -> ledger_backend::Result<Option<LedgerRange>> {
        Err(BackendError::Unavailable("store offline".into()))
    }

    async fn ledger_by_sequence(
        &self,
        _sequence: u32,
    ) -> ledger_backend::Result<Option<LedgerHeader>> {
        Err(BackendError::Unavailable("store offline".into()))
    }

    async fn ledger_object(
        &self,
        _key: &ObjectKey,
        _sequence: u32,
    ) -> ledger_backend::Result<Option<Vec<u8>>> {
        Err(BackendError::Unavailable("store offline".into()))
    }
}

#[tokio::test]
async fn backend_failure_surfaces_but_still_subscribes() {
    let engine = FeedEngine::new(Arc::new(FailingBackend), FeedExecutor::inline());
    let s1 = RecordingSession::v1();

    let err = engine.sub_ledger(&as_feed(&s1)).await.unwrap_err();
    assert!(matches!(err, FeedError::Backend(_)));

    // The subscription was installed anyway: closed ledgers still arrive.
    assert_eq!(engine.report()["ledger"], 1);
    engine.pub_ledger(&header(31), &FeeSettings::default(), "10-31", 0);
    assert_eq!(s1.sent_count(), 1);
}

#[test]
fn overlapping_streams_deliver_exactly_once() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);
    let book = Book::from_offer_sides(Issue::Xrp, iou_issue(ISSUER));

    engine.sub_transactions(&s1_feed);
    engine.sub_account(AccountId::from(ISSUER), &s1_feed);
    engine.sub_book(book, &s1_feed);

    engine.pub_transaction(&payment_tx(ISSUER), &header(33));
    assert_eq!(s1.sent_count(), 1);

    let payload = &s1.sent()[0];
    assert_eq!(payload["type"], "transaction");
    assert_eq!(payload["validated"], true);
    assert_eq!(payload["status"], "closed");
    assert_eq!(payload["ledger_index"], 33);
    assert_eq!(payload["engine_result"], "tesSUCCESS");
    assert_eq!(payload["close_time_iso"], "2000-01-01T00:00:00Z");
    assert_eq!(payload["transaction"]["hash"], payment_tx(ISSUER).hash);
    assert_eq!(payload["meta"]["TransactionIndex"], 22);
    assert_eq!(payload["meta"]["delivered_amount"], "unavailable");
}

#[test]
fn separate_sessions_each_get_their_copy() {
    let engine = engine();
    let on_tx = RecordingSession::v1();
    let on_account = RecordingSession::v1();
    let on_book = RecordingSession::v1();

    engine.sub_transactions(&as_feed(&on_tx));
    engine.sub_account(AccountId::from(ISSUER), &as_feed(&on_account));
    engine.sub_book(
        Book::from_offer_sides(Issue::Xrp, iou_issue(ISSUER)),
        &as_feed(&on_book),
    );

    engine.pub_transaction(&payment_tx(ISSUER), &header(33));
    assert_eq!(on_tx.sent_count(), 1);
    assert_eq!(on_account.sent_count(), 1);
    assert_eq!(on_book.sent_count(), 1);
}

#[test]
fn two_affected_accounts_still_deliver_once() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);

    // The transaction affects both its originator and its destination.
    engine.sub_account(AccountId::from(ACCOUNT1), &s1_feed);
    engine.sub_account(AccountId::from(ACCOUNT2), &s1_feed);

    engine.pub_transaction(&payment_tx(ISSUER), &header(33));
    assert_eq!(s1.sent_count(), 1);
}

#[test]
fn proposed_and_validated_are_independent_streams() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);

    engine.sub_transactions(&s1_feed);
    engine.sub_proposed_transactions(&s1_feed);

    let proposed = json!({
        "transaction": { "Account": ACCOUNT1, "Destination": ACCOUNT2 }
    });
    engine.forward_proposed_transaction(&proposed);
    engine.pub_transaction(&payment_tx(ISSUER), &header(33));

    let sent = s1.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], proposed);
    assert_eq!(sent[1]["type"], "transaction");
    assert_ne!(sent[0], sent[1]);
}

#[test]
fn proposed_forward_fans_out_to_proposed_accounts() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);

    // Subscribed under both affected accounts: the account fan-out dedups.
    engine.sub_proposed_account(AccountId::from(ACCOUNT1), &s1_feed);
    engine.sub_proposed_account(AccountId::from(ACCOUNT2), &s1_feed);

    let proposed = json!({
        "transaction": { "Account": ACCOUNT1, "Destination": ACCOUNT2 }
    });
    engine.forward_proposed_transaction(&proposed);
    assert_eq!(s1.sent(), vec![proposed]);

    // Validated publication does not touch proposed streams.
    engine.pub_transaction(&payment_tx(ISSUER), &header(33));
    assert_eq!(s1.sent_count(), 1);
}

#[test]
fn transactions_keep_ledger_order_per_session() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    engine.sub_transactions(&as_feed(&s1));

    let mut first = payment_tx(ISSUER);
    first.meta.transaction_index = 0;
    let mut second = payment_tx(ISSUER);
    second.meta.transaction_index = 1;

    engine.pub_transaction(&first, &header(33));
    engine.pub_transaction(&second, &header(33));

    let sent = s1.sent();
    assert_eq!(sent[0]["meta"]["TransactionIndex"], 0);
    assert_eq!(sent[1]["meta"]["TransactionIndex"], 1);
}

#[test]
fn api_v2_sessions_get_deliver_max_only() {
    let engine = engine();
    let v1 = RecordingSession::v1();
    let v2 = Arc::new(RecordingSession { api_version: 2, sent: Mutex::new(Vec::new()) });

    engine.sub_transactions(&as_feed(&v1));
    engine.sub_transactions(&(v2.clone() as Arc<dyn FeedSession>));

    engine.pub_transaction(&payment_tx(ISSUER), &header(33));

    let old = &v1.sent()[0]["transaction"];
    assert_eq!(old["Amount"], "1");
    assert_eq!(old["DeliverMax"], "1");

    let new = &v2.sent()[0]["transaction"];
    assert!(new.get("Amount").is_none());
    assert_eq!(new["DeliverMax"], "1");
}

#[tokio::test]
async fn pool_executor_delivers_in_submission_order() {
    let engine = FeedEngine::new(Arc::new(MemoryBackend::new()), FeedExecutor::pool());
    let s1 = RecordingSession::v1();
    engine.sub_manifests(&as_feed(&s1));

    for i in 0..16 {
        engine.forward_manifest(&json!({ "manifest": i }));
    }

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while s1.sent_count() < 16 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("deliveries drained");

    let sent = s1.sent();
    for (i, payload) in sent.iter().enumerate() {
        assert_eq!(payload["manifest"], i);
    }
}

#[test]
fn dead_sessions_are_never_delivered_to() {
    let engine = engine();
    let s1 = RecordingSession::v1();
    let s1_feed = as_feed(&s1);
    engine.sub_manifests(&s1_feed);
    engine.sub_validations(&s1_feed);

    drop(s1_feed);
    drop(s1);

    engine.forward_manifest(&json!({ "manifest": "test" }));
    engine.forward_validation(&json!({ "validation": "test" }));
    assert_eq!(engine.report()["manifests"], 0);
    assert_eq!(engine.report()["validations"], 0);
}
