//! Unified request and response shapes shared by all providers

use cadence_hamms::{HammsVector, RawFeatures};
use serde::{Deserialize, Serialize};

/// Track context sent to a provider for semantic analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub energy: Option<f64>,
    pub year: Option<i32>,
    /// The computed 12-dimensional vector, when available
    pub hamms_vector: Option<HammsVector>,
}

impl EnrichmentRequest {
    /// Build a request from extracted features and their vector
    pub fn from_features(features: &RawFeatures, vector: &HammsVector) -> Self {
        Self {
            title: features.title.clone(),
            artist: features.artist.clone(),
            bpm: features.bpm,
            key: features.key.clone(),
            energy: features.energy,
            year: features.year,
            hamms_vector: Some(*vector),
        }
    }
}

/// Release-date cross-check reported by the provider
///
/// Metadata years on reissues and compilations routinely disagree with
/// the original release; the provider is asked to flag the mismatch
/// instead of trusting the tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateVerification {
    #[serde(default)]
    pub artist_known: bool,
    #[serde(default)]
    pub track_known: bool,
    #[serde(default)]
    pub known_original_year: Option<String>,
    #[serde(default)]
    pub metadata_year: Option<String>,
    #[serde(default)]
    pub is_likely_reissue: bool,
    #[serde(default)]
    pub verification_notes: Option<String>,
}

/// Semantic metadata for one track, as parsed from a provider response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub subgenre: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    /// Decade label, e.g. "1980s"
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provider's own confidence in the classification, in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub date_verification: Option<DateVerification>,
    #[serde(default)]
    pub analysis_notes: Option<String>,
}

fn default_confidence() -> f64 {
    0.5
}

impl Enrichment {
    /// Clamp the confidence into [0, 1]; providers occasionally return
    /// percentages or garbage
    pub fn sanitize(mut self) -> Self {
        let confidence = self.confidence;
        self.confidence = if !confidence.is_finite() {
            0.0
        } else if confidence > 1.0 && confidence <= 100.0 {
            confidence / 100.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }
}

/// The unified response shape every provider returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Whether the provider produced a usable enrichment
    pub success: bool,
    /// Parsed enrichment; present whenever `success` is true
    pub enrichment: Option<Enrichment>,
    /// True when JSON recovery failed and the enrichment was synthesized
    /// deterministically from the request
    pub fallback: bool,
    /// Opaque raw response text, kept for audit
    pub raw_response: String,
    /// Provider identifier ("anthropic", "openai", ...)
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Wall-clock processing time
    pub elapsed_ms: u64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    /// Estimated call cost in USD
    pub cost_estimate: Option<f64>,
    pub error_message: Option<String>,
}

impl ProviderResponse {
    /// Total tokens used, when both sides were reported
    pub fn tokens_used(&self) -> Option<u32> {
        match (self.prompt_tokens, self.completion_tokens) {
            (Some(p), Some(c)) => Some(p + c),
            _ => None,
        }
    }
}
