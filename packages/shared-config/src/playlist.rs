//! Playlist generation configuration types

use serde::{Deserialize, Serialize};

use crate::{parse_env, ConfigError, ConfigResult};

/// Weights for the playlist candidate score
///
/// `score = harmonic * similarity + genre * compatibility + energy * fit`.
/// The three weights must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub harmonic: f64,
    pub genre: f64,
    pub energy: f64,
}

impl ScoreWeights {
    /// Construct weights, validating that they sum to 1
    pub fn new(harmonic: f64, genre: f64, energy: f64) -> ConfigResult<Self> {
        let total = harmonic + genre + energy;
        if (total - 1.0).abs() > 1e-9 {
            return Err(ConfigError::ValidationError(format!(
                "playlist weights must sum to 1.0, got {}",
                total
            )));
        }
        Ok(Self {
            harmonic,
            genre,
            energy,
        })
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            harmonic: 0.7,
            genre: 0.2,
            energy: 0.1,
        }
    }
}

/// Playlist generation defaults
#[derive(Debug, Clone)]
pub struct PlaylistConfig {
    /// Fractional BPM tolerance around the seed tempo
    pub bpm_tolerance: f64,

    /// Candidate score weights
    pub weights: ScoreWeights,

    /// Default playlist length when the caller does not specify one
    pub default_length: usize,
}

impl PlaylistConfig {
    /// Load playlist configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let weights = ScoreWeights::new(
            parse_env("PLAYLIST_WEIGHT_HARMONIC", 0.7)?,
            parse_env("PLAYLIST_WEIGHT_GENRE", 0.2)?,
            parse_env("PLAYLIST_WEIGHT_ENERGY", 0.1)?,
        )?;

        Ok(Self {
            bpm_tolerance: parse_env("PLAYLIST_BPM_TOLERANCE", 0.15)?,
            weights,
            default_length: parse_env("PLAYLIST_DEFAULT_LENGTH", 20)?,
        })
    }
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            bpm_tolerance: 0.15,
            weights: ScoreWeights::default(),
            default_length: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        assert!((w.harmonic + w.genre + w.energy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        assert!(ScoreWeights::new(0.5, 0.5, 0.5).is_err());
        assert!(ScoreWeights::new(0.7, 0.2, 0.1).is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = PlaylistConfig::default();
        assert!((config.bpm_tolerance - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.default_length, 20);
    }

    #[test]
    fn test_from_env_rejects_unbalanced_weights() {
        temp_env::with_vars(
            [
                ("PLAYLIST_WEIGHT_HARMONIC", Some("0.9")),
                ("PLAYLIST_WEIGHT_GENRE", Some("0.9")),
                ("PLAYLIST_WEIGHT_ENERGY", Some("0.9")),
            ],
            || {
                assert!(PlaylistConfig::from_env().is_err());
            },
        );
    }
}
