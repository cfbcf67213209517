//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DecodeError`] - Per-event decoding failures
//! - [`StorageError`] - Database/repository errors
//! - [`SourceError`] - Soroban RPC errors
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// Failures decoding a single raw contract event.
///
/// These are per-event errors: the poll loop logs them and skips the
/// offending event, the rest of the batch still proceeds.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A required topic is absent from the event envelope.
    #[error("missing topic at index {index}")]
    MissingTopic {
        /// Zero-based position of the missing topic.
        index: usize,
    },

    /// The subject topic did not decode to an address value.
    #[error("subject topic does not decode to an address")]
    NotAnAddress,

    /// XDR payload could not be parsed.
    #[error("XDR decode error: {0}")]
    Xdr(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Source Errors
// =============================================================================

/// Soroban RPC connectivity and query errors.
///
/// A source error fails the current poll cycle only; the loop retries
/// on the next tick.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP connection to the RPC node failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The RPC node returned an error response.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The RPC response could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::Poller`].
/// It wraps all lower-level errors and adds indexer-specific variants.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Soroban RPC error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    // The conversion chain lets `?` cross layer boundaries while
    // preserving the original message.
    #[test]
    fn error_conversion_chain() {
        let storage_err = StorageError::QueryError("db failed".into());
        let indexer_err: IndexerError = storage_err.into();
        assert!(indexer_err.to_string().contains("db failed"));

        let source_err = SourceError::RpcError("rpc failed".into());
        let indexer_err: IndexerError = source_err.into();
        assert!(indexer_err.to_string().contains("rpc failed"));
    }

    #[test]
    fn decode_error_names_topic_index() {
        let err = DecodeError::MissingTopic { index: 1 };
        assert!(err.to_string().contains("index 1"));
    }
}
