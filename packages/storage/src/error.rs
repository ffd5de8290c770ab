//! Storage error types

use thiserror::Error;

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored payload could not be decoded
    #[error("corrupt stored payload for track {track_id}: {reason}")]
    CorruptPayload { track_id: i64, reason: String },

    /// Filesystem access error while fingerprinting
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// Referenced track does not exist
    #[error("track not found: {0}")]
    TrackNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
