//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `remit-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing the
//!   `Repositories` trait, including the atomic batch write
//! - Individual repos: [`PgEventRepository`], [`PgProgressRepository`]
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(Arc::new(db));
//! ```

mod database;
mod event_repo;
mod progress_repo;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use event_repo::PgEventRepository;
pub use progress_repo::PgProgressRepository;

use std::sync::Arc;

use async_trait::async_trait;

use remit_core::error::{StorageError, StorageResult};
use remit_core::models::{DomainEvent, IndexerProgress};
use remit_core::ports::{EventRepository, ProgressRepository, Repositories};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories`
/// trait.
///
/// This provides a single entry point for all storage operations and
/// implements the atomic batch write that spans both tables.
pub struct PgRepositories {
    db: Arc<Database>,
    events: PgEventRepository,
    progress: PgProgressRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        let pool = db.pool().clone();
        Self {
            events: PgEventRepository::new(pool.clone()),
            progress: PgProgressRepository::new(pool),
            db,
        }
    }
}

#[async_trait]
impl Repositories for PgRepositories {
    fn events(&self) -> &dyn EventRepository {
        &self.events
    }

    fn progress(&self) -> &dyn ProgressRepository {
        &self.progress
    }

    async fn store_batch_atomic(
        &self,
        events: &[DomainEvent],
        progress: &IndexerProgress,
    ) -> StorageResult<u64> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // Insert-if-absent per event. ON CONFLICT DO NOTHING makes a
        // redelivered event a no-op instead of a constraint violation.
        let mut inserted = 0;
        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO loan_events (
                    id, kind, subject, loan_id, amount, ledger,
                    ledger_closed_at, tx_hash, contract_id, topics, value_xdr
                )
                VALUES ($1, $2, $3, $4, $5::NUMERIC, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&event.id)
            .bind(event.kind.as_str())
            .bind(&event.subject)
            .bind(event.loan_id)
            .bind(&event.amount)
            .bind(event.ledger as i64)
            .bind(event.ledger_closed_at)
            .bind(&event.tx_hash)
            .bind(&event.contract_id)
            .bind(&event.topics)
            .bind(&event.value_xdr)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

            inserted += result.rows_affected();
        }

        // Advance the progress singleton last, inside the same
        // transaction: progress must never outrun the event rows.
        sqlx::query(
            r#"
            INSERT INTO indexer_progress (singleton, last_ledger, last_cursor, updated_at)
            VALUES (TRUE, $1, $2, $3)
            ON CONFLICT (singleton) DO UPDATE SET
                last_ledger = EXCLUDED.last_ledger,
                last_cursor = EXCLUDED.last_cursor,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(progress.last_ledger as i64)
        .bind(&progress.last_cursor)
        .bind(progress.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(inserted)
    }
}
