//! In-memory ledger store.
//!
//! DashMap-backed store used by the demo binary and as the test double.
//! Headers are keyed by sequence; state objects keep every historical
//! version so reads as-of a sequence return the newest version at or below
//! it.

use crate::error::Result;
use crate::LedgerBackend;
use async_trait::async_trait;
use dashmap::DashMap;
use ledger_model::{fee_settings_key, FeeSettings, LedgerHeader, LedgerRange, ObjectKey};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// Lock-free (reads) in-memory implementation of [`LedgerBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    headers: DashMap<u32, LedgerHeader>,
    /// key -> (sequence the version was written at -> bytes)
    objects: DashMap<ObjectKey, BTreeMap<u32, Vec<u8>>>,
    range: Mutex<Option<LedgerRange>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ledger header, extending the validated range.
    pub fn put_ledger(&self, header: LedgerHeader) {
        let sequence = header.sequence;
        self.headers.insert(sequence, header);
        let mut range = self.range.lock().expect("range lock");
        *range = Some(match *range {
            None => LedgerRange { min: sequence, max: sequence },
            Some(r) => LedgerRange {
                min: r.min.min(sequence),
                max: r.max.max(sequence),
            },
        });
        debug!(sequence, "stored ledger header");
    }

    /// Store a state object version written at `sequence`.
    pub fn put_object(&self, key: ObjectKey, sequence: u32, bytes: Vec<u8>) {
        self.objects.entry(key).or_default().insert(sequence, bytes);
    }

    /// Convenience: store the fee settings entry as of `sequence`.
    pub fn put_fee_settings(&self, sequence: u32, fees: &FeeSettings) {
        self.put_object(fee_settings_key(), sequence, fees.to_bytes());
    }
}

#[async_trait]
impl LedgerBackend for MemoryBackend {
    async fn range(&self) -> Result<Option<LedgerRange>> {
        Ok(*self.range.lock().expect("range lock"))
    }

    async fn ledger_by_sequence(&self, sequence: u32) -> Result<Option<LedgerHeader>> {
        Ok(self.headers.get(&sequence).map(|h| h.clone()))
    }

    async fn ledger_object(&self, key: &ObjectKey, sequence: u32) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.get(key).and_then(|versions| {
            versions
                .range(..=sequence)
                .next_back()
                .map(|(_, bytes)| bytes.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(sequence: u32) -> LedgerHeader {
        LedgerHeader {
            sequence,
            hash: format!("{sequence:064X}"),
            close_time: 0,
        }
    }

    #[tokio::test]
    async fn range_tracks_inserted_ledgers() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.range().await.unwrap(), None);

        backend.put_ledger(header(10));
        backend.put_ledger(header(30));
        assert_eq!(
            backend.range().await.unwrap(),
            Some(LedgerRange { min: 10, max: 30 })
        );
    }

    #[tokio::test]
    async fn object_reads_are_as_of_a_sequence() {
        let backend = MemoryBackend::new();
        let key = fee_settings_key();
        backend.put_object(key, 5, b"old".to_vec());
        backend.put_object(key, 20, b"new".to_vec());

        assert_eq!(backend.ledger_object(&key, 4).await.unwrap(), None);
        assert_eq!(
            backend.ledger_object(&key, 10).await.unwrap(),
            Some(b"old".to_vec())
        );
        assert_eq!(
            backend.ledger_object(&key, 30).await.unwrap(),
            Some(b"new".to_vec())
        );
    }
}
