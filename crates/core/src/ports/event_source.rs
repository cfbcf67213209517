//! Port trait for the on-chain event source.
//!
//! This trait defines the interface for fetching contract events from a
//! Soroban RPC node. Implementations live in the infrastructure layer
//! (e.g., `remit-soroban`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SourceResult;

/// Raw contract event as returned by the source, before decoding.
///
/// Topics and value are opaque base64-encoded XDR `ScVal`s; the decoder
/// is the only component that looks inside them.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Source-assigned unique event identifier.
    pub id: String,
    /// Ledger sequence the event was emitted in.
    pub ledger: u64,
    /// Close time of that ledger.
    pub ledger_closed_at: DateTime<Utc>,
    /// Emitting contract identifier (strkey).
    pub contract_id: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
    /// Event topics, base64 XDR.
    pub topics: Vec<String>,
    /// Event value payload, base64 XDR.
    pub value: String,
}

/// One page of events plus source-side position information.
#[derive(Debug, Clone)]
pub struct EventPage {
    /// Zero or more raw events, oldest first.
    pub events: Vec<RawEvent>,
    /// Latest ledger known to the node when the page was produced.
    pub latest_ledger: u64,
    /// Opaque resumption cursor for this page, if the node returned one.
    pub cursor: Option<String>,
}

/// Port trait for the on-chain event source.
///
/// The source only exposes a pull query, so the poll loop drives it on
/// a fixed interval. Each call is stateless; network timeouts are owned
/// by the implementation.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch up to `limit` events for the configured contract, strictly
    /// after `after_ledger`. An empty page is a normal outcome.
    ///
    /// The source may redeliver events across retries; callers must
    /// treat duplicates as no-ops.
    async fn fetch_events(&self, after_ledger: u64, limit: u32) -> SourceResult<EventPage>;

    /// Latest ledger sequence known to the node. Used for startup
    /// connectivity checks and diagnostics.
    async fn latest_ledger(&self) -> SourceResult<u64>;
}
