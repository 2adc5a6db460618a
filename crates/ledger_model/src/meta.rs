//! Transaction application metadata.
//!
//! Metadata is kept close to its JSON wire form: affected nodes carry their
//! field bags as raw JSON values, since ledger entry types are open-ended.
//! Typed accessors extract the pieces the feed engine needs (affected
//! accounts, touched order books, offer deltas).

use crate::account::AccountId;
use crate::amount::Amount;
use crate::asset::Book;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Metadata describing how a transaction changed the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(rename = "AffectedNodes", default)]
    pub affected_nodes: Vec<AffectedNode>,
    #[serde(rename = "TransactionIndex")]
    pub transaction_index: u32,
    #[serde(rename = "TransactionResult")]
    pub transaction_result: String,
    #[serde(rename = "DeliveredAmount", skip_serializing_if = "Option::is_none")]
    pub delivered_amount: Option<Amount>,
}

/// One created, modified, or deleted ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AffectedNode {
    #[serde(rename = "CreatedNode")]
    Created(NodeDetails),
    #[serde(rename = "ModifiedNode")]
    Modified(NodeDetails),
    #[serde(rename = "DeletedNode")]
    Deleted(NodeDetails),
}

impl AffectedNode {
    pub fn details(&self) -> &NodeDetails {
        match self {
            AffectedNode::Created(d) | AffectedNode::Modified(d) | AffectedNode::Deleted(d) => d,
        }
    }
}

/// The field bags of an affected node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDetails {
    #[serde(rename = "LedgerEntryType")]
    pub entry_type: String,
    #[serde(rename = "LedgerIndex", skip_serializing_if = "Option::is_none")]
    pub ledger_index: Option<String>,
    #[serde(rename = "FinalFields", skip_serializing_if = "Option::is_none")]
    pub final_fields: Option<Value>,
    #[serde(rename = "NewFields", skip_serializing_if = "Option::is_none")]
    pub new_fields: Option<Value>,
    #[serde(rename = "PreviousFields", skip_serializing_if = "Option::is_none")]
    pub previous_fields: Option<Value>,
}

impl NodeDetails {
    /// The node's current field bag: final fields for modified and deleted
    /// nodes, new fields for created ones.
    pub fn current_fields(&self) -> Option<&Value> {
        self.final_fields.as_ref().or(self.new_fields.as_ref())
    }

    fn is_offer(&self) -> bool {
        self.entry_type == "Offer"
    }
}

/// The two-sided change an offer node underwent.
#[derive(Debug, Clone)]
pub struct OfferDelta {
    pub previous_gets: Amount,
    pub previous_pays: Amount,
    pub final_gets: Amount,
    pub final_pays: Amount,
}

const ACCOUNT_FIELDS: [&str; 4] = ["Account", "Owner", "Destination", "RegularKey"];

fn scan_accounts(value: &Value, out: &mut BTreeSet<AccountId>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if let Value::String(s) = inner {
                    if ACCOUNT_FIELDS.contains(&key.as_str()) || key == "issuer" {
                        out.insert(AccountId::new(s.clone()));
                        continue;
                    }
                }
                scan_accounts(inner, out);
            }
        }
        Value::Array(items) => {
            for inner in items {
                scan_accounts(inner, out);
            }
        }
        _ => {}
    }
}

impl TransactionMeta {
    /// Every account named in the affected nodes, including issuers of
    /// amounts held in node fields.
    pub fn affected_accounts(&self) -> BTreeSet<AccountId> {
        let mut accounts = BTreeSet::new();
        for node in &self.affected_nodes {
            let details = node.details();
            for fields in [
                details.final_fields.as_ref(),
                details.new_fields.as_ref(),
                details.previous_fields.as_ref(),
            ]
            .into_iter()
            .flatten()
            {
                scan_accounts(fields, &mut accounts);
            }
        }
        accounts
    }

    /// The order books touched by this transaction's offer nodes.
    pub fn touched_books(&self) -> BTreeSet<Book> {
        let mut books = BTreeSet::new();
        for node in &self.affected_nodes {
            let details = node.details();
            if !details.is_offer() {
                continue;
            }
            let Some(fields) = details.current_fields() else {
                continue;
            };
            let (Some(gets), Some(pays)) = (fields.get("TakerGets"), fields.get("TakerPays"))
            else {
                continue;
            };
            if let (Ok(gets), Ok(pays)) = (Amount::from_json(gets), Amount::from_json(pays)) {
                books.insert(Book::from_offer_sides(gets.issue(), pays.issue()));
            }
        }
        books
    }

    /// Offer deltas for book-changes aggregation: modified or deleted offer
    /// nodes whose previous fields carry both sides. Newly created offers
    /// represent no exchange and are skipped.
    pub fn offer_deltas(&self) -> Vec<OfferDelta> {
        let mut deltas = Vec::new();
        for node in &self.affected_nodes {
            let details = match node {
                AffectedNode::Modified(d) | AffectedNode::Deleted(d) => d,
                AffectedNode::Created(_) => continue,
            };
            if !details.is_offer() {
                continue;
            }
            let Some(previous) = details.previous_fields.as_ref() else {
                continue;
            };
            let (Some(prev_gets), Some(prev_pays)) =
                (previous.get("TakerGets"), previous.get("TakerPays"))
            else {
                continue;
            };
            let Some(current) = details.current_fields() else {
                continue;
            };
            let (Some(final_gets), Some(final_pays)) =
                (current.get("TakerGets"), current.get("TakerPays"))
            else {
                continue;
            };
            let parsed = (
                Amount::from_json(prev_gets),
                Amount::from_json(prev_pays),
                Amount::from_json(final_gets),
                Amount::from_json(final_pays),
            );
            if let (Ok(previous_gets), Ok(previous_pays), Ok(final_gets), Ok(final_pays)) = parsed {
                deltas.push(OfferDelta {
                    previous_gets,
                    previous_pays,
                    final_gets,
                    final_pays,
                });
            }
        }
        deltas
    }
}
