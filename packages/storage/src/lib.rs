//! Persistence layer for Cadence
//!
//! [`Storage`] is a capability passed into the orchestrator explicitly;
//! production uses the SQLite implementation, tests inject the
//! in-memory one. Per-track writes are atomic: one transaction covers
//! the track row, its vector, and its enrichment.

mod error;
mod fingerprint;
mod memory;
mod sqlite;
mod types;

use async_trait::async_trait;
use cadence_hamms::HammsVector;

pub use error::{StorageError, StorageResult};
pub use fingerprint::ContentFingerprint;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use types::{
    AnalysisRecord, AnalysisSummary, BasicTags, EnrichmentRecord, Track, VectorFilter,
    VectorSummary,
};

/// Operations the analysis core needs from its store
///
/// Single-track writes are atomic; readers see either the prior record
/// or a fully written new one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Look up a track by absolute path
    async fn get_track_by_path(&self, path: &str) -> StorageResult<Option<Track>>;

    /// Fetch a track by id
    async fn get_track(&self, track_id: i64) -> StorageResult<Option<Track>>;

    /// Create the track on first sight, or refresh its tags
    async fn upsert_track(&self, path: &str, tags: &BasicTags) -> StorageResult<Track>;

    /// Return the stored analysis when the fingerprint still matches
    async fn get_cached_analysis(
        &self,
        path: &str,
        fingerprint: &ContentFingerprint,
    ) -> StorageResult<Option<AnalysisRecord>>;

    /// Write or overwrite a track's analysis in one transaction
    async fn write_analysis(
        &self,
        track_id: i64,
        fingerprint: &ContentFingerprint,
        record: &AnalysisRecord,
    ) -> StorageResult<()>;

    /// Stream all stored vectors with their scoring context
    async fn list_vectors(&self, filter: Option<&VectorFilter>)
        -> StorageResult<Vec<VectorSummary>>;

    /// Fetch one track's vector
    async fn get_vector(&self, track_id: i64) -> StorageResult<Option<HammsVector>>;

    /// Library-wide analysis statistics
    async fn analysis_summary(&self) -> StorageResult<AnalysisSummary>;
}
