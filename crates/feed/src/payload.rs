//! Payload shaping.
//!
//! Free functions from ledger context to the JSON objects each stream
//! carries. Shapes are wire-stable: field names here are what clients see.

use crate::book_changes::BookChange;
use crate::error::{FeedError, Result};
use ledger_model::{result_info, FeeSettings, LedgerHeader, TransactionAndMetadata};
use serde_json::{json, Map, Value};

/// The ledger-window object returned synchronously from a ledger-stream
/// subscribe: same fields as the `ledgerClosed` message, minus `type` and
/// `txn_count`.
pub fn ledger_subscribe_response(
    header: &LedgerHeader,
    fees: &FeeSettings,
    validated_ledgers: &str,
) -> Value {
    json!({
        "validated_ledgers": validated_ledgers,
        "ledger_index": header.sequence,
        "ledger_hash": header.hash,
        "ledger_time": header.close_time,
        "fee_base": fees.base_fee,
        "reserve_base": fees.reserve_base,
        "reserve_inc": fees.reserve_inc,
    })
}

/// The `ledgerClosed` stream message.
pub fn ledger_closed(
    header: &LedgerHeader,
    fees: &FeeSettings,
    validated_ledgers: &str,
    txn_count: usize,
) -> Value {
    let mut payload = ledger_subscribe_response(header, fees, validated_ledgers);
    payload["type"] = json!("ledgerClosed");
    payload["txn_count"] = json!(txn_count);
    payload
}

/// The validated transaction stream message.
///
/// `api_version` selects the payment field naming: version 1 carries both
/// `Amount` and its `DeliverMax` alias, version 2 and up drop `Amount`.
pub fn transaction(
    tx: &TransactionAndMetadata,
    header: &LedgerHeader,
    api_version: u32,
) -> Result<Value> {
    let Value::Object(fields) = &tx.transaction else {
        return Err(FeedError::Shape(
            "transaction fields are not a JSON object".to_owned(),
        ));
    };
    let mut txn: Map<String, Value> = fields.clone();
    if tx.is_payment() {
        if let Some(amount) = txn.get("Amount").cloned() {
            if api_version >= 2 {
                txn.remove("Amount");
            }
            txn.insert("DeliverMax".to_owned(), amount);
        }
    }
    txn.insert("hash".to_owned(), json!(tx.hash));
    txn.insert("date".to_owned(), json!(header.close_time));

    let mut meta = serde_json::to_value(&tx.meta)?;
    meta["delivered_amount"] = tx.delivered_amount();

    let info = result_info(&tx.meta.transaction_result);
    Ok(json!({
        "transaction": txn,
        "meta": meta,
        "type": "transaction",
        "validated": true,
        "status": "closed",
        "ledger_index": header.sequence,
        "ledger_hash": header.hash,
        "engine_result_code": info.code,
        "engine_result": tx.meta.transaction_result,
        "engine_result_message": info.message,
        "close_time_iso": header.close_time_iso(),
    }))
}

/// The `bookChanges` stream message.
pub fn book_changes(header: &LedgerHeader, changes: &[BookChange]) -> Value {
    json!({
        "type": "bookChanges",
        "ledger_index": header.sequence,
        "ledger_hash": header.hash,
        "ledger_time": header.close_time,
        "changes": changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_model::TransactionMeta;
    use serde_json::json;

    fn header() -> LedgerHeader {
        LedgerHeader {
            sequence: 33,
            hash: "4BC50C9B0D8515D3EAAE1E74B29A95804346C491EE1A95BF25E4AAB854A6A652".into(),
            close_time: 0,
        }
    }

    fn payment() -> TransactionAndMetadata {
        TransactionAndMetadata {
            transaction: json!({
                "TransactionType": "Payment",
                "Account": "rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn",
                "Destination": "rLEsXccBGNR3UPuPu2hUXPjziKC3qKSBun",
                "Amount": "1",
                "Fee": "1",
                "Sequence": 32,
                "SigningPubKey": "74657374"
            }),
            hash: "51D2AAA6B8E4E16EF22F6424854283D8391B56875858A711B8CE4D5B9A422CC2".into(),
            ledger_sequence: 32,
            meta: TransactionMeta {
                affected_nodes: vec![],
                transaction_index: 22,
                transaction_result: "tesSUCCESS".into(),
                delivered_amount: None,
            },
        }
    }

    #[test]
    fn ledger_closed_extends_the_subscribe_shape() {
        let fees = FeeSettings { base_fee: 0, reserve_base: 10, reserve_inc: 0 };
        let payload = ledger_closed(&header(), &fees, "10-31", 8);
        assert_eq!(payload["type"], "ledgerClosed");
        assert_eq!(payload["txn_count"], 8);
        assert_eq!(payload["reserve_base"], 10);
        assert_eq!(payload["ledger_time"], 0);
    }

    #[test]
    fn v1_payments_carry_amount_and_deliver_max() {
        let payload = transaction(&payment(), &header(), 1).unwrap();
        assert_eq!(payload["transaction"]["Amount"], "1");
        assert_eq!(payload["transaction"]["DeliverMax"], "1");
        assert_eq!(payload["transaction"]["hash"], payment().hash);
        assert_eq!(payload["transaction"]["date"], 0);
        assert_eq!(payload["close_time_iso"], "2000-01-01T00:00:00Z");
        assert_eq!(payload["engine_result_code"], 0);
        assert_eq!(
            payload["engine_result_message"],
            "The transaction was applied. Only final in a validated ledger."
        );
        assert_eq!(payload["meta"]["delivered_amount"], "unavailable");
    }

    #[test]
    fn v2_payments_drop_amount() {
        let payload = transaction(&payment(), &header(), 2).unwrap();
        assert!(payload["transaction"].get("Amount").is_none());
        assert_eq!(payload["transaction"]["DeliverMax"], "1");
    }

    #[test]
    fn non_object_transactions_are_a_shaping_error() {
        let mut tx = payment();
        tx.transaction = json!("nope");
        assert!(transaction(&tx, &header(), 1).is_err());
    }
}
