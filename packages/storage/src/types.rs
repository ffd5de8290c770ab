//! Persisted data model

use cadence_hamms::{HammsVector, RawFeatures};
use cadence_providers::{Enrichment, ProviderResponse};
use serde::{Deserialize, Serialize};

/// Basic tags read from a file's metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
}

/// A known track: identity is the absolute path plus fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub path: String,
    pub tags: BasicTags,
    /// Fingerprint at the time of the last analysis, if any
    pub fingerprint: Option<String>,
}

/// A provider enrichment plus its accounting, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub enrichment: Enrichment,
    pub provider: String,
    pub model: String,
    /// Opaque raw response text, kept for audit
    pub raw_response: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub cost_estimate: Option<f64>,
}

impl EnrichmentRecord {
    /// Build a record from a successful provider response
    pub fn from_response(response: &ProviderResponse) -> Option<Self> {
        let enrichment = response.enrichment.clone()?;
        Some(Self {
            enrichment,
            provider: response.provider.clone(),
            model: response.model.clone(),
            raw_response: response.raw_response.clone(),
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            cost_estimate: response.cost_estimate,
        })
    }
}

/// The per-track output of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub success: bool,
    pub tags: BasicTags,
    /// The measured inputs the vector was built from
    pub features: RawFeatures,
    pub vector: Option<HammsVector>,
    pub vector_confidence: f64,
    pub enrichment: Option<EnrichmentRecord>,
    /// Confidence of the semantic enrichment; zero when enrichment was
    /// skipped or downgraded
    pub ai_confidence: f64,
    pub processing_time_ms: u64,
    pub error_message: Option<String>,
}

impl AnalysisRecord {
    /// A failed analysis, carrying the tags and the error string
    pub fn failure(tags: BasicTags, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tags,
            features: RawFeatures::default(),
            vector: None,
            vector_confidence: 0.0,
            enrichment: None,
            ai_confidence: 0.0,
            processing_time_ms: 0,
            error_message: Some(error.into()),
        }
    }

    /// Named per-dimension breakdown of the vector, if present
    pub fn dimension_scores(&self) -> Vec<(&'static str, f64)> {
        self.vector
            .map(|v| v.dimension_scores())
            .unwrap_or_default()
    }

    /// Subgenre from the enrichment, lowercased for matching
    pub fn subgenre(&self) -> Option<String> {
        self.enrichment
            .as_ref()
            .and_then(|e| e.enrichment.subgenre.as_deref())
            .map(str::to_lowercase)
    }
}

/// Filter for vector listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorFilter {
    /// Keep only tracks whose enrichment subgenre matches
    /// (case-insensitive)
    pub subgenre: Option<String>,
}

/// One row of the vector listing: what playlist scoring needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSummary {
    pub track_id: i64,
    pub vector: HammsVector,
    pub bpm: Option<f64>,
    pub energy: Option<f64>,
    pub subgenre: Option<String>,
}

/// Library-wide analysis statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_tracks: i64,
    pub total_analyzed: i64,
    pub total_enriched: i64,
    /// Share of analyzed tracks that carry an enrichment, in percent
    pub enrichment_coverage_percent: f64,
    /// Most frequent enrichment genres with their counts, descending
    pub top_genres: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_record_shape() {
        let tags = BasicTags {
            title: Some("Broken".to_string()),
            ..Default::default()
        };
        let record = AnalysisRecord::failure(tags, "decode failed");
        assert!(!record.success);
        assert!(record.vector.is_none());
        assert_eq!(record.error_message.as_deref(), Some("decode failed"));
        assert_eq!(record.vector_confidence, 0.0);
        assert!(record.dimension_scores().is_empty());
    }

    #[test]
    fn test_enrichment_record_from_response() {
        let response = ProviderResponse {
            success: true,
            enrichment: Some(Enrichment {
                genre: Some("Disco".to_string()),
                subgenre: Some("Italo Disco".to_string()),
                confidence: 0.8,
                ..Default::default()
            }),
            fallback: false,
            raw_response: "{}".to_string(),
            provider: "anthropic".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            elapsed_ms: 120,
            prompt_tokens: Some(100),
            completion_tokens: Some(40),
            cost_estimate: Some(0.0001),
            error_message: None,
        };
        let record = EnrichmentRecord::from_response(&response).unwrap();
        assert_eq!(record.provider, "anthropic");
        assert_eq!(record.enrichment.genre.as_deref(), Some("Disco"));
    }

    #[test]
    fn test_subgenre_is_lowercased() {
        let response = ProviderResponse {
            success: true,
            enrichment: Some(Enrichment {
                subgenre: Some("Italo Disco".to_string()),
                ..Default::default()
            }),
            fallback: false,
            raw_response: String::new(),
            provider: "p".to_string(),
            model: "m".to_string(),
            elapsed_ms: 0,
            prompt_tokens: None,
            completion_tokens: None,
            cost_estimate: None,
            error_message: None,
        };
        let record = AnalysisRecord {
            success: true,
            tags: BasicTags::default(),
            features: RawFeatures::default(),
            vector: None,
            vector_confidence: 0.5,
            enrichment: EnrichmentRecord::from_response(&response),
            ai_confidence: 0.5,
            processing_time_ms: 0,
            error_message: None,
        };
        assert_eq!(record.subgenre().as_deref(), Some("italo disco"));
    }
}
