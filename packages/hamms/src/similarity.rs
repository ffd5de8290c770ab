//! Weighted similarity between HAMMS vectors

use serde::{Deserialize, Serialize};

use crate::vector::{HammsVector, DIMENSIONS, DIMENSION_WEIGHTS};

/// Similarity metrics for a pair of vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Blended score in `[0, 1]`: 0.6 euclidean + 0.4 cosine
    pub overall: f64,
    /// Weighted euclidean similarity in `[0, 1]`
    pub euclidean: f64,
    /// Weighted cosine similarity in `[-1, 1]`
    pub cosine: f64,
}

/// A scored candidate from a nearest-neighbor query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub track_id: i64,
    pub score: SimilarityScore,
}

/// Compute the weighted similarity between two vectors
///
/// The vector type already guarantees dimension and range invariants,
/// so the only numeric care needed here is clamping.
pub fn similarity(u: &HammsVector, v: &HammsVector) -> SimilarityScore {
    let mut wu = [0.0f64; DIMENSIONS];
    let mut wv = [0.0f64; DIMENSIONS];
    for i in 0..DIMENSIONS {
        wu[i] = u.get(i) * DIMENSION_WEIGHTS[i];
        wv[i] = v.get(i) * DIMENSION_WEIGHTS[i];
    }

    // Euclidean distance inverted against the maximum possible distance
    let distance: f64 = wu
        .iter()
        .zip(wv.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    let max_distance: f64 = DIMENSION_WEIGHTS.iter().map(|w| w * w).sum::<f64>().sqrt();
    let euclidean = (1.0 - distance / max_distance).clamp(0.0, 1.0);

    let dot: f64 = wu.iter().zip(wv.iter()).map(|(a, b)| a * b).sum();
    let norm_u = wu.iter().map(|a| a * a).sum::<f64>().sqrt();
    let norm_v = wv.iter().map(|a| a * a).sum::<f64>().sqrt();
    let cosine = if norm_u > 0.0 && norm_v > 0.0 {
        (dot / (norm_u * norm_v)).clamp(-1.0, 1.0)
    } else if u == v {
        1.0
    } else {
        0.0
    };

    let overall = (euclidean * 0.6 + cosine * 0.4).clamp(0.0, 1.0);

    SimilarityScore {
        overall,
        euclidean,
        cosine,
    }
}

/// Rank candidates against a seed vector
///
/// Drops candidates whose overall score falls below `threshold`, sorts
/// by overall then euclidean descending with the track id as the final
/// ascending tie-break, and returns at most `limit` results. The
/// tie-break makes the ordering stable across runs.
pub fn nearest(
    seed: &HammsVector,
    candidates: &[(i64, HammsVector)],
    threshold: f64,
    limit: usize,
) -> Vec<Neighbor> {
    let mut scored: Vec<Neighbor> = candidates
        .iter()
        .map(|(track_id, vector)| Neighbor {
            track_id: *track_id,
            score: similarity(seed, vector),
        })
        .filter(|n| n.score.overall >= threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .overall
            .partial_cmp(&a.score.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.score
                    .euclidean
                    .partial_cmp(&a.score.euclidean)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    scored.truncate(limit);
    scored
}
