//! In-memory storage for tests

use std::collections::HashMap;

use async_trait::async_trait;
use cadence_hamms::HammsVector;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::fingerprint::ContentFingerprint;
use crate::types::{
    AnalysisRecord, AnalysisSummary, BasicTags, Track, VectorFilter, VectorSummary,
};
use crate::Storage;

#[derive(Default)]
struct State {
    next_id: i64,
    tracks: HashMap<i64, Track>,
    by_path: HashMap<String, i64>,
    analyses: HashMap<i64, (ContentFingerprint, AnalysisRecord)>,
}

/// HashMap-backed [`Storage`] with the same semantics as the SQLite
/// implementation; injected by tests
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored analyses (test helper)
    pub async fn analysis_count(&self) -> usize {
        self.state.read().await.analyses.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_track_by_path(&self, path: &str) -> StorageResult<Option<Track>> {
        let state = self.state.read().await;
        Ok(state
            .by_path
            .get(path)
            .and_then(|id| state.tracks.get(id))
            .cloned())
    }

    async fn get_track(&self, track_id: i64) -> StorageResult<Option<Track>> {
        Ok(self.state.read().await.tracks.get(&track_id).cloned())
    }

    async fn upsert_track(&self, path: &str, tags: &BasicTags) -> StorageResult<Track> {
        let mut state = self.state.write().await;
        if let Some(&id) = state.by_path.get(path) {
            let track = state.tracks.get_mut(&id).expect("index consistent");
            track.tags = tags.clone();
            return Ok(track.clone());
        }
        state.next_id += 1;
        let track = Track {
            id: state.next_id,
            path: path.to_string(),
            tags: tags.clone(),
            fingerprint: None,
        };
        state.by_path.insert(path.to_string(), track.id);
        state.tracks.insert(track.id, track.clone());
        Ok(track)
    }

    async fn get_cached_analysis(
        &self,
        path: &str,
        fingerprint: &ContentFingerprint,
    ) -> StorageResult<Option<AnalysisRecord>> {
        let state = self.state.read().await;
        let Some(&id) = state.by_path.get(path) else {
            return Ok(None);
        };
        Ok(state.analyses.get(&id).and_then(|(stored, record)| {
            (stored == fingerprint).then(|| record.clone())
        }))
    }

    async fn write_analysis(
        &self,
        track_id: i64,
        fingerprint: &ContentFingerprint,
        record: &AnalysisRecord,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let track = state
            .tracks
            .get_mut(&track_id)
            .ok_or(StorageError::TrackNotFound(track_id))?;
        track.fingerprint = Some(fingerprint.as_str().to_string());
        state
            .analyses
            .insert(track_id, (fingerprint.clone(), record.clone()));
        Ok(())
    }

    async fn list_vectors(
        &self,
        filter: Option<&VectorFilter>,
    ) -> StorageResult<Vec<VectorSummary>> {
        let state = self.state.read().await;
        let wanted = filter
            .and_then(|f| f.subgenre.as_deref())
            .map(str::to_lowercase);

        let mut summaries: Vec<VectorSummary> = state
            .analyses
            .iter()
            .filter_map(|(&track_id, (_, record))| {
                let vector = record.vector?;
                let subgenre = record
                    .enrichment
                    .as_ref()
                    .and_then(|e| e.enrichment.subgenre.clone());
                if let Some(wanted) = &wanted {
                    if subgenre.as_deref().map(str::to_lowercase).as_deref() != Some(wanted) {
                        return None;
                    }
                }
                Some(VectorSummary {
                    track_id,
                    vector,
                    bpm: record.features.bpm,
                    energy: record.features.energy,
                    subgenre,
                })
            })
            .collect();
        summaries.sort_by_key(|s| s.track_id);
        Ok(summaries)
    }

    async fn get_vector(&self, track_id: i64) -> StorageResult<Option<HammsVector>> {
        let state = self.state.read().await;
        Ok(state
            .analyses
            .get(&track_id)
            .and_then(|(_, record)| record.vector))
    }

    async fn analysis_summary(&self) -> StorageResult<AnalysisSummary> {
        let state = self.state.read().await;
        let total_tracks = state.tracks.len() as i64;
        let analyzed: Vec<&AnalysisRecord> = state
            .analyses
            .values()
            .filter(|(_, r)| r.vector.is_some())
            .map(|(_, r)| r)
            .collect();
        let total_analyzed = analyzed.len() as i64;

        let mut genre_counts: HashMap<String, i64> = HashMap::new();
        let mut total_enriched = 0i64;
        for record in &analyzed {
            if let Some(enrichment) = &record.enrichment {
                total_enriched += 1;
                if let Some(genre) = &enrichment.enrichment.genre {
                    *genre_counts.entry(genre.clone()).or_default() += 1;
                }
            }
        }
        let mut top_genres: Vec<(String, i64)> = genre_counts.into_iter().collect();
        top_genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_genres.truncate(5);

        let coverage = if total_analyzed > 0 {
            (total_enriched as f64 / total_analyzed as f64) * 100.0
        } else {
            0.0
        };

        Ok(AnalysisSummary {
            total_tracks,
            total_analyzed,
            total_enriched,
            enrichment_coverage_percent: (coverage * 10.0).round() / 10.0,
            top_genres,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_hamms::RawFeatures;

    fn record_with_vector(bpm: f64) -> AnalysisRecord {
        let features = RawFeatures {
            bpm: Some(bpm),
            key: Some("Am".to_string()),
            energy: Some(0.5),
            genre_hint: Some("house".to_string()),
            ..Default::default()
        };
        AnalysisRecord {
            success: true,
            tags: BasicTags::default(),
            features: features.clone(),
            vector: Some(HammsVector::from_features(&features)),
            vector_confidence: 0.8,
            enrichment: None,
            ai_confidence: 0.0,
            processing_time_ms: 5,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let storage = MemoryStorage::new();
        let track = storage
            .upsert_track("/music/a.mp3", &BasicTags::default())
            .await
            .unwrap();
        let found = storage.get_track_by_path("/music/a.mp3").await.unwrap();
        assert_eq!(found.unwrap().id, track.id);
        assert!(storage.get_track_by_path("/music/x.mp3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_respects_fingerprint() {
        let storage = MemoryStorage::new();
        let track = storage
            .upsert_track("/music/a.mp3", &BasicTags::default())
            .await
            .unwrap();
        let fp = ContentFingerprint::from_parts("/music/a.mp3", 1, 10);
        storage
            .write_analysis(track.id, &fp, &record_with_vector(120.0))
            .await
            .unwrap();

        assert!(storage
            .get_cached_analysis("/music/a.mp3", &fp)
            .await
            .unwrap()
            .is_some());

        let other = ContentFingerprint::from_parts("/music/a.mp3", 2, 10);
        assert!(storage
            .get_cached_analysis("/music/a.mp3", &other)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_vectors_sorted_by_id() {
        let storage = MemoryStorage::new();
        for (path, bpm) in [("/b.mp3", 125.0), ("/a.mp3", 120.0)] {
            let track = storage.upsert_track(path, &BasicTags::default()).await.unwrap();
            let fp = ContentFingerprint::from_parts(path, 1, 10);
            storage
                .write_analysis(track.id, &fp, &record_with_vector(bpm))
                .await
                .unwrap();
        }
        let vectors = storage.list_vectors(None).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors[0].track_id < vectors[1].track_id);
    }

    #[tokio::test]
    async fn test_write_unknown_track_fails() {
        let storage = MemoryStorage::new();
        let fp = ContentFingerprint::from_parts("/a.mp3", 1, 10);
        let result = storage
            .write_analysis(42, &fp, &record_with_vector(120.0))
            .await;
        assert!(matches!(result, Err(StorageError::TrackNotFound(42))));
    }
}
