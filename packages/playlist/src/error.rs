//! Playlist error types

use thiserror::Error;

/// Errors from similarity queries and playlist generation
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// The seed track has no stored vector
    #[error("seed track {0} has no stored analysis")]
    SeedMissing(i64),

    /// Storage read failed
    #[error("storage failed: {0}")]
    Storage(#[from] cadence_storage::StorageError),
}

/// Result type for playlist operations
pub type PlaylistResult<T> = Result<T, PlaylistError>;
