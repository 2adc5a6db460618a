//! A transaction paired with its application metadata.

use crate::account::AccountId;
use crate::asset::Book;
use crate::meta::TransactionMeta;
use serde_json::Value;
use std::collections::BTreeSet;

/// First ledger in which partial payments could deliver less than the
/// transaction's `Amount`. Before it, the delivered amount of a payment is
/// unknowable from metadata alone.
pub const PARTIAL_PAYMENT_LEDGER: u32 = 4_594_095;

/// A validated transaction as stored by the replica: the signed transaction
/// JSON, its hash, the sequence of the ledger that applied it, and the
/// application metadata.
#[derive(Debug, Clone)]
pub struct TransactionAndMetadata {
    /// The signed transaction fields, verbatim.
    pub transaction: Value,
    /// Hex-encoded transaction hash.
    pub hash: String,
    /// Sequence of the ledger the transaction was applied in.
    pub ledger_sequence: u32,
    pub meta: TransactionMeta,
}

impl TransactionAndMetadata {
    fn tx_field(&self, name: &str) -> Option<&str> {
        self.transaction.get(name).and_then(Value::as_str)
    }

    pub fn is_payment(&self) -> bool {
        self.tx_field("TransactionType") == Some("Payment")
    }

    /// Accounts a publication of this transaction concerns: everything the
    /// metadata names plus the transaction's own originator and destination.
    pub fn affected_accounts(&self) -> BTreeSet<AccountId> {
        let mut accounts = self.meta.affected_accounts();
        for field in ["Account", "Destination"] {
            if let Some(address) = self.tx_field(field) {
                accounts.insert(AccountId::from(address));
            }
        }
        accounts
    }

    /// Order books this transaction touched.
    pub fn touched_books(&self) -> BTreeSet<Book> {
        self.meta.touched_books()
    }

    /// The `delivered_amount` published with the metadata: the metadata's
    /// own figure when recorded, the payment's `Amount` for ledgers new
    /// enough to record partial deliveries, `"unavailable"` otherwise.
    pub fn delivered_amount(&self) -> Value {
        if let Some(delivered) = &self.meta.delivered_amount {
            return serde_json::to_value(delivered).expect("amounts always serialize");
        }
        if self.is_payment() && self.ledger_sequence >= PARTIAL_PAYMENT_LEDGER {
            if let Some(amount) = self.transaction.get("Amount") {
                return amount.clone();
            }
        }
        Value::String("unavailable".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use serde_json::json;

    fn payment(ledger_sequence: u32, delivered: Option<Amount>) -> TransactionAndMetadata {
        TransactionAndMetadata {
            transaction: json!({
                "TransactionType": "Payment",
                "Account": "rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn",
                "Destination": "rLEsXccBGNR3UPuPu2hUXPjziKC3qKSBun",
                "Amount": "1"
            }),
            hash: "51D2AAA6B8E4E16EF22F6424854283D8391B56875858A711B8CE4D5B9A422CC2".into(),
            ledger_sequence,
            meta: TransactionMeta {
                affected_nodes: vec![],
                transaction_index: 0,
                transaction_result: "tesSUCCESS".into(),
                delivered_amount: delivered,
            },
        }
    }

    #[test]
    fn delivered_amount_prefers_the_metadata_figure() {
        let tx = payment(5_000_000, Some(Amount::Drops("7".into())));
        assert_eq!(tx.delivered_amount(), json!("7"));
    }

    #[test]
    fn old_ledgers_report_unavailable() {
        let tx = payment(32, None);
        assert_eq!(tx.delivered_amount(), json!("unavailable"));
    }

    #[test]
    fn recent_payments_fall_back_to_amount() {
        let tx = payment(PARTIAL_PAYMENT_LEDGER, None);
        assert_eq!(tx.delivered_amount(), json!("1"));
    }

    #[test]
    fn originator_and_destination_are_affected() {
        let accounts = payment(32, None).affected_accounts();
        assert!(accounts.contains(&AccountId::from("rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn")));
        assert!(accounts.contains(&AccountId::from("rLEsXccBGNR3UPuPu2hUXPjziKC3qKSBun")));
    }
}
