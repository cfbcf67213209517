//! Core domain layer for the remit lending-event indexer.
//!
//! This crate contains the domain models, port traits (interfaces), the
//! event decoder, and the poll loop service for indexing lending events
//! emitted by a Soroban contract. It follows hexagonal architecture
//! principles - this is the innermost layer with no dependencies on
//! infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     remitd (binary)                         │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │        remit-soroban         │        remit-storage         │
//! │          (RPC)               │        (PostgreSQL)          │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                     remit-core  ← YOU ARE HERE              │
//! │            (models, ports, decode, services)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (DomainEvent, IndexerProgress)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`decode`] - Raw event to domain event decoding
//! - [`services`] - Core business logic (Poller)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::EventSource`] - Fetch contract events from a Soroban RPC node
//! - [`ports::Repositories`] - Persist and query indexed data
//!
//! ## Indexer Lifecycle
//!
//! 1. Read the progress singleton (last processed ledger + cursor)
//! 2. Fetch one batch of raw events strictly past that ledger
//! 3. Decode each raw event into a domain event (per-event failures skip)
//! 4. Persist the batch and the advanced progress in one transaction
//! 5. Sleep for the configured interval, repeat until `stop()`

pub mod decode;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
