//! Soroban RPC adapter for the remit lending-event indexer.
//!
//! Implements the [`remit_core::ports::EventSource`] port over the
//! Soroban JSON-RPC interface (`getEvents`, `getLatestLedger`).

mod client;

pub use client::{SorobanClient, SorobanClientConfig};
