//! Deterministic fallback enrichment when JSON recovery fails

use crate::types::{DateVerification, Enrichment, EnrichmentRequest};

/// Confidence ceiling for synthesized enrichments
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Synthesize a coarse enrichment from the request alone
///
/// Used when every JSON recovery strategy fails: tempo and energy give
/// a rough genre and mood, the metadata year gives the era. The result
/// is marked so downstream consumers can distinguish it from a real
/// model classification.
pub fn fallback_enrichment(request: &EnrichmentRequest) -> Enrichment {
    let bpm = request.bpm.unwrap_or(120.0);
    let energy = request.energy.unwrap_or(0.5);

    let (genre, subgenre) = if bpm > 140.0 {
        ("electronic", "high-energy")
    } else if bpm >= 120.0 {
        ("pop", "dance-pop")
    } else if bpm >= 90.0 {
        ("rock", "mid-tempo")
    } else {
        ("ballad", "slow")
    };

    let mood = if energy >= 0.7 {
        "energetic"
    } else if energy <= 0.3 {
        "calm"
    } else {
        "neutral"
    };

    let era = request.year.map(|year| format!("{}0s", year / 10));

    Enrichment {
        genre: Some(genre.to_string()),
        subgenre: Some(subgenre.to_string()),
        mood: Some(mood.to_string()),
        era,
        tags: vec![genre.to_string(), format!("{}bpm", bpm as i64)],
        confidence: FALLBACK_CONFIDENCE,
        date_verification: Some(DateVerification {
            metadata_year: request.year.map(|y| y.to_string()),
            verification_notes: Some("fallback classification".to_string()),
            ..Default::default()
        }),
        analysis_notes: Some("fallback classification from tempo and energy".to_string()),
    }
}
