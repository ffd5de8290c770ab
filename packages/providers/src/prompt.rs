//! Analysis prompt construction shared by every provider

use crate::types::EnrichmentRequest;

/// System instruction sent alongside the analysis prompt
pub const SYSTEM_PROMPT: &str =
    "You are a music analysis expert. Respond with valid JSON only.";

/// Build the unified analysis prompt for a track
///
/// All providers send the same prompt; the response contract is the
/// JSON shape parsed into [`Enrichment`](crate::Enrichment).
pub fn build_analysis_prompt(request: &EnrichmentRequest) -> String {
    let title = request.title.as_deref().unwrap_or("Unknown");
    let artist = request.artist.as_deref().unwrap_or("Unknown");
    let key = request.key.as_deref().unwrap_or("Unknown");
    let bpm = request
        .bpm
        .map(|b| format!("{:.0}", b))
        .unwrap_or_else(|| "Unknown".to_string());
    let energy = request
        .energy
        .map(|e| format!("{:.2}", e))
        .unwrap_or_else(|| "Unknown".to_string());
    let year = request
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let hamms_line = match &request.hamms_vector {
        Some(vector) => {
            let formatted: Vec<String> = vector
                .as_slice()
                .iter()
                .map(|v| format!("{:.3}", v))
                .collect();
            format!("\nHAMMS Vector: [{}]", formatted.join(", "))
        }
        None => String::new(),
    };

    format!(
        r#"Analyze this music track and return ONLY a JSON response:

Track: {artist} - {title}
BPM: {bpm}
Key: {key}
Energy: {energy}
Year: {year}{hamms_line}

CRITICAL: Determine the original release year if you know this artist/track, then classify accurately. Metadata years on reissues and compilations are unreliable.

Required JSON format:
{{
    "date_verification": {{
        "artist_known": true/false,
        "track_known": true/false,
        "known_original_year": "1979" or null,
        "metadata_year": "{year}",
        "is_likely_reissue": true/false,
        "verification_notes": "Brief explanation"
    }},
    "genre": "specific primary genre",
    "subgenre": "more specific classification",
    "mood": "emotional mood/atmosphere",
    "era": "decade (1970s/1980s/1990s/2000s/2010s/2020s)",
    "tags": ["descriptive", "keywords", "style"],
    "confidence": 0.85,
    "analysis_notes": "Brief explanation"
}}

Genre guidelines: be precise (prefer "Italo Disco" over "dance"); use the era of the original recording, not the metadata year; cross-check BPM and energy against the claimed genre. Return ONLY valid JSON."#
    )
}
