//! Amounts in the ledger's JSON encoding.

use crate::account::AccountId;
use crate::asset::Issue;
use crate::error::{ModelError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An amount as it appears in transaction and metadata JSON: a bare decimal
/// string for native drops, or a `{currency, issuer, value}` object for an
/// issued currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Drops(String),
    Issued {
        currency: String,
        issuer: AccountId,
        value: String,
    },
}

impl Amount {
    pub fn issue(&self) -> Issue {
        match self {
            Amount::Drops(_) => Issue::Xrp,
            Amount::Issued { currency, issuer, .. } => Issue::Iou {
                currency: currency.clone(),
                issuer: issuer.clone(),
            },
        }
    }

    /// The numeric value, parsed as a decimal.
    pub fn value(&self) -> Result<Decimal> {
        let raw = match self {
            Amount::Drops(v) => v,
            Amount::Issued { value, .. } => value,
        };
        Decimal::from_str(raw).map_err(|_| ModelError::BadAmount(raw.clone()))
    }

    /// Parse an amount out of a JSON value, failing on anything that is not
    /// a valid amount encoding.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(ModelError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn drops_parse_as_native() {
        let amount = Amount::from_json(&json!("3")).unwrap();
        assert_eq!(amount.issue(), Issue::Xrp);
        assert_eq!(amount.value().unwrap(), Decimal::from(3));
    }

    #[test]
    fn issued_amount_carries_its_issue() {
        let amount = Amount::from_json(&json!({
            "currency": "USD",
            "issuer": "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD",
            "value": "1.5"
        }))
        .unwrap();
        assert_eq!(
            amount.issue(),
            Issue::Iou {
                currency: "USD".into(),
                issuer: "rK9DrarGKnVEo2nYp5MfVRXRYf5yRX3mwD".into()
            }
        );
        assert_eq!(amount.value().unwrap(), Decimal::new(15, 1));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Amount::from_json(&serde_json::json!(["no"])).is_err());
        assert!(Amount::Drops("x".into()).value().is_err());
    }
}
