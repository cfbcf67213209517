//! Domain models representing indexed lending events.
//!
//! These models are storage-agnostic and represent the canonical
//! form of indexed data within the domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Event Kind
// =============================================================================

/// Recognized lending-contract event kinds.
///
/// The contract may emit other events; anything not listed here is
/// treated as "not of interest" and skipped during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LoanRequested,
    LoanApproved,
    LoanRepaid,
}

impl EventKind {
    /// Parse the symbol tag emitted as the first event topic.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "loan_requested" => Some(Self::LoanRequested),
            "loan_approved" => Some(Self::LoanApproved),
            "loan_repaid" => Some(Self::LoanRepaid),
            _ => None,
        }
    }

    /// Stable string form, used as the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoanRequested => "loan_requested",
            Self::LoanApproved => "loan_approved",
            Self::LoanRepaid => "loan_repaid",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Domain Event
// =============================================================================

/// Decoded lending event, immutable once persisted.
///
/// Created from exactly one raw contract event. The raw topic and value
/// encodings are kept verbatim so future reprocessing does not require
/// re-querying the RPC node (whose retention window is limited).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Source-assigned unique event identifier.
    pub id: String,
    /// Recognized event kind.
    pub kind: EventKind,
    /// Strkey address of the account or contract the event concerns.
    pub subject: String,
    /// Loan identifier, if the event is tied to a specific loan.
    pub loan_id: Option<i64>,
    /// Amount as a decimal string (i128 range). Never a float: large
    /// currency values must not lose precision.
    pub amount: Option<String>,
    /// Ledger sequence the event was emitted in.
    pub ledger: u64,
    /// Close time of that ledger.
    pub ledger_closed_at: DateTime<Utc>,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
    /// Emitting contract identifier.
    pub contract_id: String,
    /// Raw topics, base64 XDR, preserved verbatim.
    pub topics: Vec<String>,
    /// Raw value payload, base64 XDR, preserved verbatim.
    pub value_xdr: String,
}

// =============================================================================
// Indexer State
// =============================================================================

/// Singleton progress record tracking where to resume.
///
/// Written only by a successful non-empty poll cycle. `last_ledger` is
/// monotonically non-decreasing and always equals the maximum ledger
/// among events persisted in the most recent successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerProgress {
    /// Last fully processed ledger sequence.
    pub last_ledger: u64,
    /// Opaque resumption cursor returned by the source, kept for
    /// forensics; resume is ledger-driven.
    pub last_cursor: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl IndexerProgress {
    /// Zero-value default used when no progress row exists yet (first
    /// run, or after a purge). Resuming from here re-scans from ledger
    /// 0, bounded by the source's retention window.
    pub fn genesis() -> Self {
        Self {
            last_ledger: 0,
            last_cursor: None,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
