//! Account identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base58 account identifier (e.g. `rf1BiGeXwwQoi8Z2ueFYTEXSwuJYfV2Jpn`).
///
/// The replica never needs to decode the underlying 20 bytes; accounts are
/// compared and hashed by their canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(address: &str) -> Self {
        Self(address.to_owned())
    }
}

impl From<String> for AccountId {
    fn from(address: String) -> Self {
        Self(address)
    }
}
