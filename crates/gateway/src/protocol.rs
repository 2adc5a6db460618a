//! WebSocket protocol message types.
//!
//! JSON command/reply format between clients and the gateway. Commands
//! name streams and keys; replies confirm or carry the ledger window.

use ledger_model::{AccountId, Book, Issue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The unkeyed streams a client can name in a subscribe command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Ledger,
    Transactions,
    TransactionsProposed,
    Manifests,
    Validations,
    BookChanges,
}

/// One side of an order book in a subscribe command. `XRP` with no issuer
/// names the native asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSpec {
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<AccountId>,
}

impl IssueSpec {
    pub fn to_issue(&self) -> Result<Issue, String> {
        if self.currency == "XRP" {
            if self.issuer.is_some() {
                return Err("the native asset has no issuer".to_owned());
            }
            return Ok(Issue::Xrp);
        }
        match &self.issuer {
            Some(issuer) => Ok(Issue::Iou {
                currency: self.currency.clone(),
                issuer: issuer.clone(),
            }),
            None => Err(format!("currency {} requires an issuer", self.currency)),
        }
    }
}

/// An order book in a subscribe command, named by its two offer sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSpec {
    pub taker_gets: IssueSpec,
    pub taker_pays: IssueSpec,
}

impl BookSpec {
    pub fn to_book(&self) -> Result<Book, String> {
        Ok(Book::from_offer_sides(
            self.taker_gets.to_issue()?,
            self.taker_pays.to_issue()?,
        ))
    }
}

/// Message sent from client to gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe to streams and/or keyed topics.
    Subscribe {
        #[serde(default)]
        streams: Vec<Stream>,
        #[serde(default)]
        accounts: Vec<AccountId>,
        #[serde(default)]
        accounts_proposed: Vec<AccountId>,
        #[serde(default)]
        books: Vec<BookSpec>,
        /// Payload shape version for this session; sticky once set.
        #[serde(default)]
        api_version: Option<u32>,
    },
    /// Remove subscriptions.
    Unsubscribe {
        #[serde(default)]
        streams: Vec<Stream>,
        #[serde(default)]
        accounts: Vec<AccountId>,
        #[serde(default)]
        accounts_proposed: Vec<AccountId>,
        #[serde(default)]
        books: Vec<BookSpec>,
    },
    /// Keepalive.
    Ping,
}

/// Message sent from gateway to client in reply to a command. Stream
/// payloads themselves are emitted by the feed engine and are not wrapped.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    Subscribed {
        /// Ledger window and fee schedule, present when the `ledger`
        /// stream was among the subscriptions.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    Unsubscribed,
    Pong,
    Error { message: String },
}

impl ServerReply {
    pub fn error(err: impl std::fmt::Display) -> Self {
        ServerReply::Error { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_command_parses_streams_and_books() {
        let raw = json!({
            "command": "subscribe",
            "streams": ["ledger", "book_changes"],
            "accounts": ["rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn"],
            "books": [
                {
                    "taker_gets": { "currency": "XRP" },
                    "taker_pays": {
                        "currency": "0158415500000000C1F76FF6ECB0BAC600000000",
                        "issuer": "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD"
                    }
                }
            ]
        });
        let command: ClientCommand = serde_json::from_value(raw).unwrap();
        let ClientCommand::Subscribe { streams, accounts, books, .. } = command else {
            panic!("expected subscribe");
        };
        assert_eq!(streams, vec![Stream::Ledger, Stream::BookChanges]);
        assert_eq!(accounts.len(), 1);
        let book = books[0].to_book().unwrap();
        assert_eq!(book.in_issue, Issue::Xrp);
    }

    #[test]
    fn native_asset_with_issuer_is_rejected() {
        let spec = IssueSpec {
            currency: "XRP".into(),
            issuer: Some("rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn".into()),
        };
        assert!(spec.to_issue().is_err());
    }

    #[test]
    fn issued_currency_without_issuer_is_rejected() {
        let spec = IssueSpec { currency: "USD".into(), issuer: None };
        assert!(spec.to_issue().is_err());
    }

    #[test]
    fn replies_tag_their_type() {
        let reply = serde_json::to_value(ServerReply::Pong).unwrap();
        assert_eq!(reply, json!({ "type": "pong" }));
        let reply = serde_json::to_value(ServerReply::Subscribed { result: None }).unwrap();
        assert_eq!(reply, json!({ "type": "subscribed" }));
    }
}
