//! k-nearest compatible-track search over stored vectors

use cadence_hamms::{nearest, Neighbor};
use cadence_storage::Storage;
use tracing::instrument;

use crate::error::{PlaylistError, PlaylistResult};

/// Maximum number of similar tracks a query may request
const MAX_RESULTS: usize = 100;

/// Find tracks compatible with a seed track
///
/// Scores every stored vector against the seed, drops candidates below
/// `threshold`, and returns up to `limit` results ordered by overall
/// similarity descending with the track id as the deterministic
/// tie-break.
///
/// # Errors
/// - `PlaylistError::SeedMissing` when the seed has no stored vector
/// - `PlaylistError::Storage` when the listing fails
#[instrument(skip(storage))]
pub async fn find_similar(
    storage: &dyn Storage,
    seed_id: i64,
    threshold: f64,
    limit: usize,
) -> PlaylistResult<Vec<Neighbor>> {
    let limit = limit.clamp(1, MAX_RESULTS);

    let seed_vector = storage
        .get_vector(seed_id)
        .await?
        .ok_or(PlaylistError::SeedMissing(seed_id))?;

    let candidates: Vec<(i64, cadence_hamms::HammsVector)> = storage
        .list_vectors(None)
        .await?
        .into_iter()
        .filter(|summary| summary.track_id != seed_id)
        .map(|summary| (summary.track_id, summary.vector))
        .collect();

    Ok(nearest(&seed_vector, &candidates, threshold, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_hamms::{HammsVector, RawFeatures};
    use cadence_storage::{
        AnalysisRecord, BasicTags, ContentFingerprint, MemoryStorage,
    };

    async fn seed_pool(storage: &MemoryStorage, specs: &[(f64, &str)]) -> Vec<i64> {
        let mut ids = Vec::new();
        for (i, (bpm, genre)) in specs.iter().enumerate() {
            let path = format!("/music/{i}.mp3");
            let features = RawFeatures {
                bpm: Some(*bpm),
                key: Some("Am".to_string()),
                energy: Some(0.5),
                genre_hint: Some(genre.to_string()),
                ..Default::default()
            };
            let record = AnalysisRecord {
                success: true,
                tags: BasicTags::default(),
                features: features.clone(),
                vector: Some(HammsVector::from_features(&features)),
                vector_confidence: 0.8,
                enrichment: None,
                ai_confidence: 0.0,
                processing_time_ms: 1,
                error_message: None,
            };
            let track = storage
                .upsert_track(&path, &record.tags)
                .await
                .unwrap();
            let fp = ContentFingerprint::from_parts(&path, 1, 10);
            storage.write_analysis(track.id, &fp, &record).await.unwrap();
            ids.push(track.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_missing_seed() {
        let storage = MemoryStorage::new();
        let result = find_similar(&storage, 42, 0.5, 10).await;
        assert!(matches!(result, Err(PlaylistError::SeedMissing(42))));
    }

    #[tokio::test]
    async fn test_excludes_seed_and_orders_by_similarity() {
        let storage = MemoryStorage::new();
        let ids = seed_pool(
            &storage,
            &[(120.0, "house"), (121.0, "house"), (180.0, "metal")],
        )
        .await;

        let results = find_similar(&storage, ids[0], 0.0, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|n| n.track_id != ids[0]));
        // The close house track outranks the distant metal one
        assert_eq!(results[0].track_id, ids[1]);
        assert!(results[0].score.overall > results[1].score.overall);
    }

    #[tokio::test]
    async fn test_threshold_filters() {
        let storage = MemoryStorage::new();
        let ids = seed_pool(&storage, &[(120.0, "house"), (190.0, "metal")]).await;

        let strict = find_similar(&storage, ids[0], 0.99, 10).await.unwrap();
        assert!(strict.len() <= 1);
    }
}
