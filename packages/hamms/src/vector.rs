//! The 12-dimensional HAMMS vector and its construction

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camelot::{key_mode, normalize_key, KeyMode};
use crate::features::RawFeatures;
use crate::profile::genre_profile;

/// Number of vector dimensions
pub const DIMENSIONS: usize = 12;

/// Dimension names, in vector order
pub const DIMENSION_NAMES: [&str; DIMENSIONS] = [
    "bpm",
    "key",
    "energy",
    "danceability",
    "valence",
    "acousticness",
    "instrumentalness",
    "rhythmic_pattern",
    "spectral_centroid",
    "tempo_stability",
    "harmonic_complexity",
    "dynamic_range",
];

/// Fixed weights applied in similarity scoring, in vector order
///
/// Key and tempo dominate; production-style dimensions carry the least
/// weight. Tunable defaults, not contracts.
pub const DIMENSION_WEIGHTS: [f64; DIMENSIONS] =
    [1.3, 1.4, 1.2, 0.9, 0.8, 0.6, 0.5, 1.1, 0.7, 0.9, 0.8, 0.6];

/// Assumed tempo for derived dimensions when none was measured
const ASSUMED_BPM: f64 = 120.0;

/// Assumed energy for derived dimensions when none was measured
const NEUTRAL_ENERGY: f64 = 0.5;

/// Violations of the vector invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("vector must have exactly {DIMENSIONS} dimensions, got {0}")]
    WrongDimension(usize),

    #[error("dimension {index} ({name}) out of range: {value}")]
    OutOfRange {
        index: usize,
        name: &'static str,
        value: f64,
    },

    #[error("dimension {index} ({name}) is not finite")]
    NotFinite { index: usize, name: &'static str },
}

/// A validated 12-dimensional feature vector in `[0, 1]^12`
///
/// The invariants (exact length, all values finite and in range) hold
/// for every constructed value; deserialization re-validates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HammsVector([f64; DIMENSIONS]);

impl HammsVector {
    /// Construct from raw values, validating every invariant
    pub fn new(values: [f64; DIMENSIONS]) -> Result<Self, VectorError> {
        for (index, &value) in values.iter().enumerate() {
            let name = DIMENSION_NAMES[index];
            if !value.is_finite() {
                return Err(VectorError::NotFinite { index, name });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(VectorError::OutOfRange { index, name, value });
            }
        }
        Ok(Self(values))
    }

    /// Build the vector from raw features
    ///
    /// Pure and bit-reproducible: no randomness, no clock. Missing
    /// inputs produce the neutral 0.5 on their direct dimensions, and
    /// derived dimensions fall back to the genre table baselines.
    pub fn from_features(features: &RawFeatures) -> Self {
        let genre = features.genre_lower().unwrap_or_default();
        let profile = genre_profile(&genre);

        let measured_bpm = features.bpm.filter(|b| *b > 0.0);
        let bpm = measured_bpm.unwrap_or(ASSUMED_BPM);
        let energy = features
            .energy
            .filter(|e| e.is_finite())
            .unwrap_or(NEUTRAL_ENERGY);
        let key = features.key.as_deref().unwrap_or("");
        let mode = key_mode(key);

        let norm_bpm = match measured_bpm {
            Some(bpm) => clamp01((bpm - 60.0) / 140.0),
            None => 0.5,
        };
        let norm_key = normalize_key(key);
        let norm_energy = match features.energy {
            Some(e) => clamp01(e),
            None => 0.5,
        };

        // Danceability: genre baseline scaled by energy and how close the
        // tempo sits to the 110-140 BPM window
        let bpm_window = if (110.0..=140.0).contains(&bpm) {
            1.0
        } else {
            let distance = (bpm - 110.0).abs().min((bpm - 140.0).abs());
            (1.0 - distance / 50.0).max(0.3)
        };
        let danceability = clamp01(profile.danceability * energy * bpm_window);

        // Valence: genre baseline blended with the key mode
        let mode_valence = match mode {
            KeyMode::Major => 0.7,
            KeyMode::Minor => 0.4,
            KeyMode::Unknown => 0.5,
        };
        let valence = clamp01(profile.valence * 0.7 + mode_valence * 0.3);

        let acousticness = clamp01(profile.acousticness);

        // Instrumentalness: title cues push toward instrumental
        let title = features
            .title
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let title_cue = ["instrumental", "remix", "mix", "version"]
            .iter()
            .any(|cue| title.contains(cue));
        let instrumentalness =
            clamp01(profile.instrumentalness + if title_cue { 0.3 } else { 0.0 });

        // Rhythmic pattern: faster tempo reads as more complex
        let tempo_ratio = clamp01((bpm - 60.0) / 140.0);
        let rhythmic_pattern = clamp01(profile.rhythm + tempo_ratio * 0.2);

        // Spectral centroid: energy brightens the timbre
        let spectral_centroid = clamp01(profile.brightness + energy * 0.3);

        let tempo_stability = clamp01(profile.tempo_stability);

        // Harmonic complexity: minor keys read as more complex
        let mode_complexity = match mode {
            KeyMode::Minor => 0.6,
            KeyMode::Major => 0.4,
            KeyMode::Unknown => 0.5,
        };
        let harmonic_complexity =
            clamp01(mode_complexity * 0.4 + profile.harmonic_complexity * 0.6);

        // Dynamic range: quiet tracks leave more headroom
        let dynamic_range = clamp01(profile.dynamic_range + (1.0 - energy) * 0.2);

        Self([
            norm_bpm,
            norm_key,
            norm_energy,
            danceability,
            valence,
            acousticness,
            instrumentalness,
            rhythmic_pattern,
            spectral_centroid,
            tempo_stability,
            harmonic_complexity,
            dynamic_range,
        ])
    }

    /// Borrow the raw values in dimension order
    pub fn as_slice(&self) -> &[f64; DIMENSIONS] {
        &self.0
    }

    /// Value of a single dimension by index
    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }

    /// Named per-dimension breakdown, in vector order
    pub fn dimension_scores(&self) -> Vec<(&'static str, f64)> {
        DIMENSION_NAMES.iter().copied().zip(self.0).collect()
    }

    /// Re-check the invariants; violations are programmer errors
    pub fn validate(&self) -> Result<(), VectorError> {
        Self::new(self.0).map(|_| ())
    }
}

impl TryFrom<Vec<f64>> for HammsVector {
    type Error = VectorError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let array: [f64; DIMENSIONS] = values
            .try_into()
            .map_err(|v: Vec<f64>| VectorError::WrongDimension(v.len()))?;
        Self::new(array)
    }
}

impl From<HammsVector> for Vec<f64> {
    fn from(vector: HammsVector) -> Self {
        vector.0.to_vec()
    }
}

/// Clamp into `[0, 1]`, mapping non-finite inputs to neutral
fn clamp01(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Confidence in an analysis given which inputs were actually measured
///
/// Starts from 0.8 and drops for each missing input: 0.2 for tempo,
/// 0.1 each for key and energy.
pub fn analysis_confidence(features: &RawFeatures) -> f64 {
    let mut confidence: f64 = 0.8;
    if !features.has_bpm() {
        confidence -= 0.2;
    }
    if !features.has_key() {
        confidence -= 0.1;
    }
    if !features.has_energy() {
        confidence -= 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house_track() -> RawFeatures {
        RawFeatures {
            bpm: Some(120.0),
            key: Some("Am".to_string()),
            energy: Some(0.5),
            genre_hint: Some("house".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_construction_literals() {
        let vector = HammsVector::from_features(&house_track());

        let expected_bpm = (120.0 - 60.0) / 140.0;
        assert!((vector.get(0) - expected_bpm).abs() < 1e-4);
        assert!((vector.get(1) - 7.0 / 12.0).abs() < 1e-4);
        assert!((vector.get(2) - 0.5).abs() < 1e-4);
        // danceability("house") * energy * bpm window = 0.9 * 0.5 * 1.0
        assert!((vector.get(3) - 0.45).abs() < 1e-4);
    }

    #[test]
    fn test_construction_is_reproducible() {
        let features = house_track();
        let a = HammsVector::from_features(&features);
        let b = HammsVector::from_features(&features);
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_dimensions_valid_for_empty_features() {
        let vector = HammsVector::from_features(&RawFeatures::default());
        vector.validate().unwrap();
        // Direct dimensions are exactly neutral when unmeasured
        assert_eq!(vector.get(0), 0.5);
        assert_eq!(vector.get(1), 0.5);
        assert_eq!(vector.get(2), 0.5);
    }

    #[test]
    fn test_extreme_inputs_are_clamped() {
        let features = RawFeatures {
            bpm: Some(10_000.0),
            energy: Some(7.5),
            ..Default::default()
        };
        let vector = HammsVector::from_features(&features);
        vector.validate().unwrap();
        assert_eq!(vector.get(0), 1.0);
        assert_eq!(vector.get(2), 1.0);
    }

    #[test]
    fn test_non_finite_energy_is_neutralized() {
        let features = RawFeatures {
            energy: Some(f64::NAN),
            ..Default::default()
        };
        let vector = HammsVector::from_features(&features);
        vector.validate().unwrap();
        assert_eq!(vector.get(2), 0.5);
    }

    #[test]
    fn test_title_cue_raises_instrumentalness() {
        let mut features = house_track();
        let base = HammsVector::from_features(&features).get(6);
        features.title = Some("Night Drive (Instrumental Mix)".to_string());
        let cued = HammsVector::from_features(&features).get(6);
        assert!((cued - (base + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let short: Vec<f64> = vec![0.5; 11];
        assert_eq!(
            HammsVector::try_from(short),
            Err(VectorError::WrongDimension(11))
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut values = [0.5; DIMENSIONS];
        values[3] = 1.5;
        assert!(matches!(
            HammsVector::new(values),
            Err(VectorError::OutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let mut values = [0.5; DIMENSIONS];
        values[0] = f64::NAN;
        assert!(matches!(
            HammsVector::new(values),
            Err(VectorError::NotFinite { index: 0, .. })
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let vector = HammsVector::from_features(&house_track());
        let json = serde_json::to_string(&vector).unwrap();
        let parsed: HammsVector = serde_json::from_str(&json).unwrap();
        assert_eq!(vector, parsed);
    }

    #[test]
    fn test_serde_rejects_invalid_payload() {
        let json = "[0.5, 0.5, 0.5]";
        assert!(serde_json::from_str::<HammsVector>(json).is_err());

        let json = "[2.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]";
        assert!(serde_json::from_str::<HammsVector>(json).is_err());
    }

    #[test]
    fn test_confidence_formula() {
        assert!((analysis_confidence(&house_track()) - 0.8).abs() < 1e-9);

        let missing_bpm = RawFeatures {
            key: Some("Am".to_string()),
            energy: Some(0.5),
            ..Default::default()
        };
        assert!((analysis_confidence(&missing_bpm) - 0.6).abs() < 1e-9);

        assert!((analysis_confidence(&RawFeatures::default()) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_scores_names() {
        let vector = HammsVector::from_features(&house_track());
        let scores = vector.dimension_scores();
        assert_eq!(scores.len(), DIMENSIONS);
        assert_eq!(scores[0].0, "bpm");
        assert_eq!(scores[11].0, "dynamic_range");
    }
}
