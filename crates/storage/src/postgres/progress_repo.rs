//! Progress repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use remit_core::error::{StorageError, StorageResult};
use remit_core::models::IndexerProgress;
use remit_core::ports::ProgressRepository;

/// PostgreSQL implementation of ProgressRepository.
///
/// The table holds at most one row; a missing row means first run and
/// maps to the genesis default.
pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn get_progress(&self) -> StorageResult<IndexerProgress> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT last_ledger, last_cursor, updated_at
            FROM indexer_progress
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row
            .map(ProgressRow::into_progress)
            .unwrap_or_else(IndexerProgress::genesis))
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    last_ledger: i64,
    last_cursor: Option<String>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProgressRow {
    fn into_progress(self) -> IndexerProgress {
        IndexerProgress {
            last_ledger: self.last_ledger as u64,
            last_cursor: self.last_cursor,
            updated_at: self.updated_at,
        }
    }
}
