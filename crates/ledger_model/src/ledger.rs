//! Ledger headers, ranges, and the fee settings entry.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z).
pub const LEDGER_EPOCH_OFFSET: i64 = 946_684_800;

/// Header of a closed ledger, as read from the replica's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub sequence: u32,
    /// Hex-encoded ledger hash.
    pub hash: String,
    /// Close time in whole seconds since the ledger epoch.
    pub close_time: u64,
}

impl LedgerHeader {
    /// Close time rendered as ISO-8601 with a trailing `Z`.
    pub fn close_time_iso(&self) -> String {
        let unix = LEDGER_EPOCH_OFFSET + self.close_time as i64;
        DateTime::from_timestamp(unix, 0)
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "2000-01-01T00:00:00Z".to_owned())
    }
}

/// The contiguous range of validated ledgers the replica holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRange {
    pub min: u32,
    pub max: u32,
}

impl LedgerRange {
    /// The `"<min>-<max>"` form used in ledger stream payloads.
    pub fn to_validated_string(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }
}

/// Key of an object in the ledger's state tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(pub [u8; 32]);

/// The fixed key of the fee settings entry. There is exactly one per ledger.
pub fn fee_settings_key() -> ObjectKey {
    let mut key = [0u8; 32];
    key[0] = b'e';
    ObjectKey(key)
}

/// The fee schedule entry. Absent fields default to zero, matching an
/// entry that predates the corresponding amendment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSettings {
    #[serde(default)]
    pub base_fee: u64,
    #[serde(default)]
    pub reserve_base: u64,
    #[serde(default)]
    pub reserve_inc: u64,
}

impl FeeSettings {
    /// Decode a fee settings entry from its stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("fee settings always serialize")
    }
}
