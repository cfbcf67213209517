//! Event repository implementation for PostgreSQL.
//!
//! Read-only: inserts go through the atomic batch write on the
//! composite repository so progress can never outrun the data.

use async_trait::async_trait;
use sqlx::PgPool;

use remit_core::error::{StorageError, StorageResult};
use remit_core::models::{DomainEvent, EventKind};
use remit_core::ports::EventRepository;

const SELECT_COLUMNS: &str = "id, kind, subject, loan_id, amount::TEXT AS amount, ledger, \
                              ledger_closed_at, tx_hash, contract_id, topics, value_xdr";

/// PostgreSQL implementation of EventRepository.
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn get_event(&self, id: &str) -> StorageResult<Option<DomainEvent>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM loan_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(EventRow::into_event).transpose()
    }

    async fn list_for_subject(
        &self,
        subject: &str,
        limit: u32,
    ) -> StorageResult<Vec<DomainEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM loan_events \
             WHERE subject = $1 \
             ORDER BY ledger DESC, id DESC \
             LIMIT $2"
        ))
        .bind(subject)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn list_for_loan(&self, loan_id: i64, limit: u32) -> StorageResult<Vec<DomainEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM loan_events \
             WHERE loan_id = $1 \
             ORDER BY ledger ASC, id ASC \
             LIMIT $2"
        ))
        .bind(loan_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn list_recent(
        &self,
        kind: Option<EventKind>,
        limit: u32,
    ) -> StorageResult<Vec<DomainEvent>> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM loan_events \
                     WHERE kind = $1 \
                     ORDER BY ledger DESC, id DESC \
                     LIMIT $2"
                ))
                .bind(kind.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM loan_events \
                     ORDER BY ledger DESC, id DESC \
                     LIMIT $1"
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter().map(EventRow::into_event).collect()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: String,
    kind: String,
    subject: String,
    loan_id: Option<i64>,
    amount: Option<String>,
    ledger: i64,
    ledger_closed_at: chrono::DateTime<chrono::Utc>,
    tx_hash: String,
    contract_id: String,
    topics: Vec<String>,
    value_xdr: String,
}

impl EventRow {
    pub(crate) fn into_event(self) -> StorageResult<DomainEvent> {
        let kind = parse_kind(&self.kind)?;

        Ok(DomainEvent {
            id: self.id,
            kind,
            subject: self.subject,
            loan_id: self.loan_id,
            amount: self.amount,
            ledger: self.ledger as u64,
            ledger_closed_at: self.ledger_closed_at,
            tx_hash: self.tx_hash,
            contract_id: self.contract_id,
            topics: self.topics,
            value_xdr: self.value_xdr,
        })
    }
}

/// Parse the stored kind string back into the enum. Only rows written
/// by the indexer itself should ever be present, so a mismatch means
/// data corruption.
fn parse_kind(kind: &str) -> StorageResult<EventKind> {
    EventKind::from_tag(kind).ok_or_else(|| {
        StorageError::SerializationError(format!("unknown stored event kind: {kind}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_rejects_unknown_values() {
        assert!(parse_kind("loan_requested").is_ok());
        let err = parse_kind("bogus").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
