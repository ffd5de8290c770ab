//! Analyzer error types

use thiserror::Error;

/// Errors the orchestrator surfaces to its caller
///
/// Provider failures never appear here: they downgrade the record
/// (enrichment omitted) instead of failing the analysis. Extraction
/// failures are persisted as `success = false` records and returned as
/// values, not errors.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Input path absent
    #[error("file missing: {0}")]
    FileMissing(String),

    /// A produced vector failed its invariants; this is a programmer
    /// error and propagates immediately
    #[error("vector invariant violated: {0}")]
    VectorInvariant(#[from] cadence_hamms::VectorError),

    /// Persistence failed; nothing was returned to the caller, so no
    /// inconsistent state is observable
    #[error("storage failed: {0}")]
    Storage(#[from] cadence_storage::StorageError),

    /// Caller-requested abort
    #[error("analysis cancelled")]
    Cancelled,
}

/// Result type for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
