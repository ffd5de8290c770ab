//! Content fingerprints used as cache keys

use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cache key derived from (path, modification time, size)
///
/// Two equal fingerprints mean a stored analysis may be reused; any
/// touch of the file (even a bare mtime change) produces a new
/// fingerprint and forces re-analysis. Collisions are treated as
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Fingerprint a file on disk
    ///
    /// # Errors
    /// Propagates filesystem errors (missing file, permission).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let mtime_nanos = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Ok(Self::from_parts(
            &path.to_string_lossy(),
            mtime_nanos,
            metadata.len(),
        ))
    }

    /// Build a fingerprint from raw parts
    pub fn from_parts(path: &str, mtime_nanos: u128, size: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(mtime_nanos.to_le_bytes());
        hasher.update(size.to_le_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().fold(String::with_capacity(64), |mut s, b| {
            use fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        });
        Self(hex)
    }

    /// Wrap an already-computed fingerprint string (from storage)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
