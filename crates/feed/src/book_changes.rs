//! Book-changes aggregation.
//!
//! Walks a ledger's successful transactions and tallies, per order book,
//! the traded volumes and the per-fill exchange rates. Sides are
//! canonicalized so the native asset (or, between two issued currencies,
//! the lexicographically smaller issue) is always side A.

use ledger_model::{Issue, TransactionAndMetadata};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// One aggregated book entry of a `bookChanges` payload. Volumes and rates
/// are decimal strings; a book that saw no fill reports `"-1"` for all four
/// rate fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookChange {
    pub currency_a: String,
    pub currency_b: String,
    pub volume_a: String,
    pub volume_b: String,
    pub high: String,
    pub low: String,
    pub open: String,
    pub close: String,
}

#[derive(Debug, Default)]
struct Tally {
    volume_a: Decimal,
    volume_b: Decimal,
    rates: Option<Rates>,
}

#[derive(Debug, Clone, Copy)]
struct Rates {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

impl Tally {
    fn record_fill(&mut self, rate: Decimal) {
        match &mut self.rates {
            None => {
                self.rates = Some(Rates { open: rate, high: rate, low: rate, close: rate });
            }
            Some(rates) => {
                rates.high = rates.high.max(rate);
                rates.low = rates.low.min(rate);
                rates.close = rate;
            }
        }
    }
}

fn render(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Aggregate offer deltas across a ledger's transactions.
pub fn compute(transactions: &[TransactionAndMetadata]) -> Vec<BookChange> {
    let mut tally: BTreeMap<(Issue, Issue), Tally> = BTreeMap::new();

    for tx in transactions {
        if tx.meta.transaction_result != "tesSUCCESS" {
            continue;
        }
        for delta in tx.meta.offer_deltas() {
            let values = (
                delta.previous_gets.value(),
                delta.final_gets.value(),
                delta.previous_pays.value(),
                delta.final_pays.value(),
            );
            let (Ok(prev_gets), Ok(final_gets), Ok(prev_pays), Ok(final_pays)) = values else {
                warn!(tx_hash = %tx.hash, "unparseable offer amounts; node skipped");
                continue;
            };
            let delta_gets = prev_gets - final_gets;
            let delta_pays = prev_pays - final_pays;

            let gets_issue = delta.previous_gets.issue();
            let pays_issue = delta.previous_pays.issue();
            let gets_is_side_a = if gets_issue.is_native() {
                true
            } else if pays_issue.is_native() {
                false
            } else {
                gets_issue <= pays_issue
            };
            let (issue_a, delta_a, issue_b, delta_b) = if gets_is_side_a {
                (gets_issue, delta_gets, pays_issue, delta_pays)
            } else {
                (pays_issue, delta_pays, gets_issue, delta_gets)
            };

            // Nothing to divide by, nothing to tally.
            if delta_b.is_zero() {
                continue;
            }

            let entry = tally.entry((issue_a, issue_b)).or_default();
            entry.volume_a += delta_a.abs();
            entry.volume_b += delta_b.abs();

            // A fill consumes both sides of the offer; anything else (an
            // offer growing, a one-sided adjustment) moves volume but has
            // no meaningful price.
            if delta_gets > Decimal::ZERO && delta_pays > Decimal::ZERO {
                entry.record_fill(delta_a / delta_b);
            }
        }
    }

    tally
        .into_iter()
        .filter(|(_, t)| !(t.volume_a.is_zero() && t.volume_b.is_zero()))
        .map(|((issue_a, issue_b), t)| {
            let (high, low, open, close) = match t.rates {
                Some(r) => (render(r.high), render(r.low), render(r.open), render(r.close)),
                None => {
                    let sentinel = "-1".to_owned();
                    (sentinel.clone(), sentinel.clone(), sentinel.clone(), sentinel)
                }
            };
            BookChange {
                currency_a: issue_a.label(),
                currency_b: issue_b.label(),
                volume_a: render(t.volume_a),
                volume_b: render(t.volume_b),
                high,
                low,
                open,
                close,
            }
        })
        .collect()
}
