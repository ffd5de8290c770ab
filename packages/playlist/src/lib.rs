//! Similarity queries and playlist generation
//!
//! Consumes the vectors persisted by the analyzer: k-nearest
//! compatible-track search, and seeded playlist assembly under BPM,
//! genre-compatibility, and energy-flow constraints. Everything here is
//! pure compute over storage reads and is deterministic for identical
//! inputs.

mod compat;
mod curve;
mod error;
mod generator;
mod similar;

pub use compat::{compatibility, compatibility_opt};
pub use curve::EnergyCurve;
pub use error::{PlaylistError, PlaylistResult};
pub use generator::{Playlist, PlaylistEntry, PlaylistGenerator, PlaylistOptions, PlaylistSummary};
pub use similar::find_similar;
