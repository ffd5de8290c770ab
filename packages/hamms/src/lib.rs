//! HAMMS: 12-dimensional harmonic-mixing feature vectors
//!
//! This crate is the pure-compute core of Cadence. It turns raw track
//! features (tempo, key, energy, genre hint) into a validated
//! 12-dimensional vector in `[0, 1]^12`, and scores pairs of vectors for
//! harmonic-mixing compatibility with a fixed weighted metric.
//!
//! Nothing in here performs I/O or suspends; construction is a pure
//! function of its inputs and is bit-reproducible.

mod camelot;
mod features;
mod profile;
mod similarity;
mod vector;

pub use camelot::{key_mode, normalize_key, KeyMode};
pub use features::RawFeatures;
pub use similarity::{nearest, similarity, Neighbor, SimilarityScore};
pub use vector::{
    analysis_confidence, HammsVector, VectorError, DIMENSIONS, DIMENSION_NAMES, DIMENSION_WEIGHTS,
};
