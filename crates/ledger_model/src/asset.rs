//! Asset issues and order books.

use crate::account::AccountId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An asset issue: the native asset, or a currency code bound to its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    /// The native asset, denominated in drops.
    Xrp,
    /// An issued currency. The code is the 40-hex-char form or a 3-letter
    /// ISO-style code, kept verbatim.
    Iou { currency: String, issuer: AccountId },
}

impl Issue {
    /// Label used in book-changes payloads: `XRP_drops` for the native
    /// asset, `<issuer>/<currency>` otherwise.
    pub fn label(&self) -> String {
        match self {
            Issue::Xrp => "XRP_drops".to_owned(),
            Issue::Iou { currency, issuer } => format!("{issuer}/{currency}"),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Issue::Xrp)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// Native sorts first; issued currencies sort by label. This is the canonical
// side ordering for book-changes aggregation.
impl Ord for Issue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Issue::Xrp, Issue::Xrp) => Ordering::Equal,
            (Issue::Xrp, Issue::Iou { .. }) => Ordering::Less,
            (Issue::Iou { .. }, Issue::Xrp) => Ordering::Greater,
            (a, b) => a.label().cmp(&b.label()),
        }
    }
}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A directional order book, identified by the pair of issues offers in it
/// exchange. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Book {
    pub in_issue: Issue,
    pub out_issue: Issue,
}

impl Book {
    pub fn new(in_issue: Issue, out_issue: Issue) -> Self {
        Self { in_issue, out_issue }
    }

    /// The book an offer sits in, reconstructed from its two sides.
    pub fn from_offer_sides(taker_gets: Issue, taker_pays: Issue) -> Self {
        Self {
            in_issue: taker_gets,
            out_issue: taker_pays,
        }
    }
}

impl Ord for Book {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.in_issue, &self.out_issue).cmp(&(&other.in_issue, &other.out_issue))
    }
}

impl PartialOrd for Book {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.in_issue, self.out_issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_sorts_before_issued() {
        let iou = Issue::Iou {
            currency: "0158415500000000C1F76FF6ECB0BAC600000000".into(),
            issuer: "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD".into(),
        };
        assert!(Issue::Xrp < iou);
        assert_eq!(Issue::Xrp.label(), "XRP_drops");
        assert_eq!(
            iou.label(),
            "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD/0158415500000000C1F76FF6ECB0BAC600000000"
        );
    }

    #[test]
    fn books_compare_by_value() {
        let iou = Issue::Iou {
            currency: "USD".into(),
            issuer: "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD".into(),
        };
        let a = Book::new(Issue::Xrp, iou.clone());
        let b = Book::from_offer_sides(Issue::Xrp, iou);
        assert_eq!(a, b);
    }
}
