//! Raw per-track features consumed by the vector builder

use serde::{Deserialize, Serialize};

/// Raw features extracted from a single track
///
/// Every field is optional: an absent value means "not measured", never
/// a default masquerading as measured. The vector builder substitutes
/// neutral values per dimension; the confidence score reflects what was
/// actually available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    /// Track title from tags
    pub title: Option<String>,
    /// Artist name from tags
    pub artist: Option<String>,
    /// Album title from tags
    pub album: Option<String>,
    /// Release year from tags
    pub year: Option<i32>,
    /// Tempo in beats per minute
    pub bpm: Option<f64>,
    /// Musical key, either a key name ("A minor", "F#m") or Camelot ("8A")
    pub key: Option<String>,
    /// Energy scalar in [0, 1]
    pub energy: Option<f64>,
    /// Coarse genre hint from tags, matched against the closed profile table
    pub genre_hint: Option<String>,
}

impl RawFeatures {
    /// True when tempo was actually measured (present and positive)
    pub fn has_bpm(&self) -> bool {
        matches!(self.bpm, Some(bpm) if bpm > 0.0)
    }

    /// True when a key string is present and non-empty
    pub fn has_key(&self) -> bool {
        matches!(self.key.as_deref(), Some(k) if !k.trim().is_empty())
    }

    /// True when energy was actually measured (present and positive)
    pub fn has_energy(&self) -> bool {
        matches!(self.energy, Some(e) if e > 0.0)
    }

    /// Lowercased genre hint, if any
    pub(crate) fn genre_lower(&self) -> Option<String> {
        self.genre_hint
            .as_deref()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
    }
}
