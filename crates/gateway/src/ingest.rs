//! Ingestion surface for the upstream ledger applier.
//!
//! The applier posts each closed ledger (header, fee schedule, transactions
//! with metadata) and any relayed manifests, validations, and proposed
//! transactions. The handlers store the ledger, then drive the feed
//! engine's publication entry points in the required order.

use crate::ws_server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ledger_backend::LedgerBackend;
use ledger_model::{FeeSettings, LedgerHeader, LedgerRange, TransactionAndMetadata, TransactionMeta};
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// A closed ledger as posted by the applier.
#[derive(Debug, Deserialize)]
pub struct LedgerIngest {
    pub header: LedgerHeader,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub transactions: Vec<TransactionIngest>,
}

/// One applied transaction within a posted ledger.
#[derive(Debug, Deserialize)]
pub struct TransactionIngest {
    pub transaction: Value,
    pub hash: String,
    pub meta: TransactionMeta,
}

pub async fn ingest_ledger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LedgerIngest>,
) -> impl IntoResponse {
    let LedgerIngest { header, fees, transactions } = body;

    state.backend.put_ledger(header.clone());
    state.backend.put_fee_settings(header.sequence, &fees);
    let validated = state
        .backend
        .range()
        .await
        .ok()
        .flatten()
        .unwrap_or(LedgerRange { min: header.sequence, max: header.sequence })
        .to_validated_string();

    let mut txns: Vec<TransactionAndMetadata> = transactions
        .into_iter()
        .map(|tx| TransactionAndMetadata {
            transaction: tx.transaction,
            hash: tx.hash,
            ledger_sequence: header.sequence,
            meta: tx.meta,
        })
        .collect();
    // Transaction payloads go out in ledger application order.
    txns.sort_by_key(|tx| tx.meta.transaction_index);

    state.engine.pub_ledger(&header, &fees, &validated, txns.len());
    for tx in &txns {
        state.engine.pub_transaction(tx, &header);
    }
    state.engine.pub_book_changes(&header, &txns);

    counter!("gateway_ledgers_ingested_total").increment(1);
    info!(sequence = header.sequence, txn_count = txns.len(), "published ledger");
    StatusCode::ACCEPTED
}

pub async fn ingest_proposed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.engine.forward_proposed_transaction(&body);
    counter!("gateway_proposed_ingested_total").increment(1);
    StatusCode::ACCEPTED
}

pub async fn ingest_manifest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.engine.forward_manifest(&body);
    StatusCode::ACCEPTED
}

pub async fn ingest_validation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.engine.forward_validation(&body);
    StatusCode::ACCEPTED
}
