//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `remit-storage`).
//!
//! The indexer is the sole writer against these tables; the read-side
//! API layer only consumes the query methods. Running multiple indexer
//! instances against one store is unsupported - they would race on the
//! progress singleton.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{DomainEvent, EventKind, IndexerProgress};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for the append-only event store.
///
/// All methods are reads; inserts happen exclusively through
/// [`Repositories::store_batch_atomic`] so that progress can never
/// advance past events that were not durably stored.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Get event by its source-assigned id.
    async fn get_event(&self, id: &str) -> StorageResult<Option<DomainEvent>>;

    /// List events whose subject matches the given address, newest first.
    async fn list_for_subject(&self, subject: &str, limit: u32)
    -> StorageResult<Vec<DomainEvent>>;

    /// List events tied to a specific loan, oldest first.
    async fn list_for_loan(&self, loan_id: i64, limit: u32) -> StorageResult<Vec<DomainEvent>>;

    /// List recent events, optionally filtered by kind, newest first.
    async fn list_recent(
        &self,
        kind: Option<EventKind>,
        limit: u32,
    ) -> StorageResult<Vec<DomainEvent>>;
}

/// Repository for the indexer progress singleton.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Current progress, or [`IndexerProgress::genesis`] when no row
    /// exists yet (first run).
    async fn get_progress(&self) -> StorageResult<IndexerProgress>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the indexer.
///
/// This trait provides access to the individual repositories and the
/// atomic write operation that spans both tables.
#[async_trait]
pub trait Repositories: Send + Sync {
    /// Access the event repository.
    fn events(&self) -> &dyn EventRepository;

    /// Access the progress repository.
    fn progress(&self) -> &dyn ProgressRepository;

    /// Persist a batch of decoded events and the advanced progress
    /// record in a single transaction.
    ///
    /// Each event is insert-if-absent on its id: a pre-existing row is
    /// a successful no-op, not an error, because the source redelivers
    /// events across overlapping polls. If any step fails, the whole
    /// batch is rolled back and the stored progress is left untouched.
    ///
    /// Returns the number of newly inserted rows.
    async fn store_batch_atomic(
        &self,
        events: &[DomainEvent],
        progress: &IndexerProgress,
    ) -> StorageResult<u64>;
}
