//! Seeded playlist generation

use std::sync::Arc;

use cadence_hamms::similarity;
use cadence_shared_config::{PlaylistConfig, ScoreWeights};
use cadence_storage::{Storage, VectorSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::compat::compatibility_opt;
use crate::curve::EnergyCurve;
use crate::error::{PlaylistError, PlaylistResult};

/// Score difference below which candidates count as tied
const SCORE_EPS: f64 = 1e-9;

/// Minimum BPM-jump improvement an adjacent swap must buy
const SWAP_EPS: f64 = 1e-6;

/// Genre-compatibility cutoff for the hard filter
const COMPAT_CUTOFF: f64 = 0.6;

/// Options for one playlist request
#[derive(Debug, Clone)]
pub struct PlaylistOptions {
    /// Fractional BPM window around the seed tempo
    pub bpm_tolerance: f64,
    /// Restrict the candidate pool to one subgenre
    pub subgenre_focus: Option<String>,
    /// Target energy shape over the playlist
    pub curve: EnergyCurve,
    /// Candidate score weights
    pub weights: ScoreWeights,
}

impl Default for PlaylistOptions {
    fn default() -> Self {
        Self {
            bpm_tolerance: 0.15,
            subgenre_focus: None,
            curve: EnergyCurve::Flat,
            weights: ScoreWeights::default(),
        }
    }
}

impl PlaylistOptions {
    /// Derive options from the shared playlist configuration
    pub fn from_config(config: &PlaylistConfig) -> Self {
        Self {
            bpm_tolerance: config.bpm_tolerance,
            weights: config.weights,
            ..Default::default()
        }
    }
}

/// One selected track with its scoring context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub track_id: i64,
    pub bpm: Option<f64>,
    pub energy: Option<f64>,
    pub subgenre: Option<String>,
    /// Raw similarity to the seed
    pub similarity: f64,
    /// Combined selection score at pick time
    pub score: f64,
}

/// Quality summary for a generated playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Fraction of tracks inside the requested BPM window
    pub bpm_adherence: f64,
    /// Average adjacent genre compatibility
    pub genre_coherence: f64,
    /// Average adjacent `1 - |Δenergy|`
    pub energy_flow: f64,
    /// True when the pool could not fill the requested length
    pub short: bool,
}

/// A generated playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub seed_id: i64,
    pub entries: Vec<PlaylistEntry>,
    pub summary: PlaylistSummary,
}

#[derive(Debug, Clone)]
struct Candidate {
    summary: VectorSummary,
    similarity: f64,
    compat: f64,
}

/// Builds playlists from a seed track over the stored vectors
pub struct PlaylistGenerator {
    storage: Arc<dyn Storage>,
}

impl PlaylistGenerator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Generate up to `length` tracks around the seed
    ///
    /// Deterministic: the same pool, seed, and options always produce
    /// the same ordering. The seed itself is never included.
    ///
    /// # Errors
    /// - `PlaylistError::SeedMissing` when the seed has no stored vector
    /// - `PlaylistError::Storage` on read failure
    #[instrument(skip(self, options))]
    pub async fn generate(
        &self,
        seed_id: i64,
        length: usize,
        options: &PlaylistOptions,
    ) -> PlaylistResult<Playlist> {
        let all = self.storage.list_vectors(None).await?;
        let seed = all
            .iter()
            .find(|s| s.track_id == seed_id)
            .cloned()
            .ok_or(PlaylistError::SeedMissing(seed_id))?;

        // Candidate pool, optionally focused on one subgenre
        let focus = options.subgenre_focus.as_deref().map(str::to_lowercase);
        let pool: Vec<VectorSummary> = all
            .into_iter()
            .filter(|s| s.track_id != seed_id)
            .filter(|s| match &focus {
                Some(focus) => s
                    .subgenre
                    .as_deref()
                    .is_some_and(|sub| sub.to_lowercase() == *focus),
                None => true,
            })
            .collect();
        let short_pool = pool.len() < length;

        let mut candidates: Vec<Candidate> = pool
            .into_iter()
            .map(|summary| Candidate {
                similarity: similarity(&seed.vector, &summary.vector).overall,
                compat: compatibility_opt(summary.subgenre.as_deref(), seed.subgenre.as_deref()),
                summary,
            })
            .collect();

        // BPM window, widened by half once if it starves the pool
        if let Some(seed_bpm) = seed.bpm.filter(|b| *b > 0.0) {
            let within = |c: &Candidate, tolerance: f64| {
                c.summary
                    .bpm
                    .is_some_and(|bpm| (bpm - seed_bpm).abs() / seed_bpm <= tolerance)
            };
            let strict: Vec<Candidate> = candidates
                .iter()
                .filter(|c| within(c, options.bpm_tolerance))
                .cloned()
                .collect();
            candidates = if strict.len() >= length {
                strict
            } else {
                let widened = options.bpm_tolerance * 1.5;
                debug!(widened, "BPM window starved the pool, widening once");
                candidates
                    .into_iter()
                    .filter(|c| within(c, widened))
                    .collect()
            };
        }

        // Genre compatibility cutoff, relaxed if it would halve the list
        let compatible: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.compat >= COMPAT_CUTOFF)
            .cloned()
            .collect();
        if compatible.len() >= length.div_ceil(2) {
            candidates = compatible;
        }

        let seed_energy = seed.energy.unwrap_or(0.5);
        let mut entries = self.select(candidates, length, seed_energy, options);
        smooth_bpm_ordering(&mut entries, seed.bpm);

        let summary = summarize(&seed, &entries, options, short_pool || entries.len() < length);
        info!(
            selected = entries.len(),
            bpm_adherence = summary.bpm_adherence,
            genre_coherence = summary.genre_coherence,
            "Playlist generated"
        );

        Ok(Playlist {
            seed_id,
            entries,
            summary,
        })
    }

    /// Greedy position-by-position pick with the curve-prescribed
    /// energy target; ties break toward the lower track id
    fn select(
        &self,
        mut remaining: Vec<Candidate>,
        length: usize,
        seed_energy: f64,
        options: &PlaylistOptions,
    ) -> Vec<PlaylistEntry> {
        let target_len = length.min(remaining.len());
        let mut entries = Vec::with_capacity(target_len);

        for position in 0..target_len {
            let target_energy = options.curve.target(position, target_len, seed_energy);

            let mut best_index = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (index, candidate) in remaining.iter().enumerate() {
                let energy = candidate.summary.energy.unwrap_or(seed_energy);
                let energy_fit = 1.0 - (energy - target_energy).abs();
                let score = options.weights.harmonic * candidate.similarity
                    + options.weights.genre * candidate.compat
                    + options.weights.energy * energy_fit;

                let wins = score > best_score + SCORE_EPS
                    || ((score - best_score).abs() <= SCORE_EPS
                        && candidate.summary.track_id < remaining[best_index].summary.track_id);
                if wins {
                    best_index = index;
                    best_score = score;
                }
            }

            let chosen = remaining.swap_remove(best_index);
            entries.push(PlaylistEntry {
                track_id: chosen.summary.track_id,
                bpm: chosen.summary.bpm,
                energy: chosen.summary.energy,
                subgenre: chosen.summary.subgenre,
                similarity: chosen.similarity,
                score: best_score,
            });
        }

        entries
    }
}

/// One pass of adjacent swaps that reduce consecutive BPM jumps
fn smooth_bpm_ordering(entries: &mut [PlaylistEntry], seed_bpm: Option<f64>) {
    if entries.len() < 2 {
        return;
    }
    let fallback = seed_bpm.unwrap_or(120.0);
    let bpm_of = |e: &PlaylistEntry| e.bpm.unwrap_or(fallback);

    for i in 0..entries.len() - 1 {
        let prev = if i == 0 {
            seed_bpm
        } else {
            Some(bpm_of(&entries[i - 1]))
        };
        let next = entries.get(i + 2).map(|e| bpm_of(e));

        let a = bpm_of(&entries[i]);
        let b = bpm_of(&entries[i + 1]);

        let edge = |x: Option<f64>, y: f64| x.map_or(0.0, |x| (x - y).abs());
        let current = edge(prev, a) + (a - b).abs() + edge(next, b);
        let swapped = edge(prev, b) + (b - a).abs() + edge(next, a);

        if current - swapped > SWAP_EPS {
            entries.swap(i, i + 1);
        }
    }
}

fn summarize(
    seed: &VectorSummary,
    entries: &[PlaylistEntry],
    options: &PlaylistOptions,
    short: bool,
) -> PlaylistSummary {
    if entries.is_empty() {
        return PlaylistSummary {
            bpm_adherence: 0.0,
            genre_coherence: 0.0,
            energy_flow: 0.0,
            short,
        };
    }

    let bpm_adherence = match seed.bpm.filter(|b| *b > 0.0) {
        Some(seed_bpm) => {
            let within = entries
                .iter()
                .filter(|e| {
                    e.bpm
                        .is_some_and(|b| (b - seed_bpm).abs() / seed_bpm <= options.bpm_tolerance)
                })
                .count();
            within as f64 / entries.len() as f64
        }
        None => 1.0,
    };

    // Adjacent compatibility over the seed-led sequence
    let mut coherence_terms = Vec::with_capacity(entries.len());
    let mut previous = seed.subgenre.as_deref();
    for entry in entries {
        coherence_terms.push(compatibility_opt(previous, entry.subgenre.as_deref()));
        previous = entry.subgenre.as_deref();
    }
    let genre_coherence = coherence_terms.iter().sum::<f64>() / coherence_terms.len() as f64;

    let seed_energy = seed.energy.unwrap_or(0.5);
    let mut flow_terms = Vec::with_capacity(entries.len());
    let mut prev_energy = seed_energy;
    for entry in entries {
        let energy = entry.energy.unwrap_or(seed_energy);
        flow_terms.push(1.0 - (energy - prev_energy).abs());
        prev_energy = energy;
    }
    let energy_flow = flow_terms.iter().sum::<f64>() / flow_terms.len() as f64;

    PlaylistSummary {
        bpm_adherence,
        genre_coherence,
        energy_flow,
        short,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_hamms::{HammsVector, RawFeatures};
    use cadence_storage::{AnalysisRecord, BasicTags, ContentFingerprint, MemoryStorage};

    async fn store_track(
        storage: &MemoryStorage,
        path: &str,
        bpm: f64,
        energy: f64,
        subgenre: Option<&str>,
    ) -> i64 {
        let features = RawFeatures {
            bpm: Some(bpm),
            key: Some("Am".to_string()),
            energy: Some(energy),
            genre_hint: Some("house".to_string()),
            ..Default::default()
        };
        let enrichment = subgenre.map(|sub| cadence_storage::EnrichmentRecord {
            enrichment: cadence_providers::Enrichment {
                genre: Some("Electronic".to_string()),
                subgenre: Some(sub.to_string()),
                confidence: 0.8,
                ..Default::default()
            },
            provider: "test".to_string(),
            model: "test".to_string(),
            raw_response: String::new(),
            prompt_tokens: None,
            completion_tokens: None,
            cost_estimate: None,
        });
        let record = AnalysisRecord {
            success: true,
            tags: BasicTags::default(),
            features: features.clone(),
            vector: Some(HammsVector::from_features(&features)),
            vector_confidence: 0.8,
            ai_confidence: if enrichment.is_some() { 0.8 } else { 0.0 },
            enrichment,
            processing_time_ms: 1,
            error_message: None,
        };
        let track = storage.upsert_track(path, &record.tags).await.unwrap();
        let fp = ContentFingerprint::from_parts(path, 1, 10);
        storage.write_analysis(track.id, &fp, &record).await.unwrap();
        track.id
    }

    #[tokio::test]
    async fn test_seed_missing() {
        let storage = Arc::new(MemoryStorage::new());
        let generator = PlaylistGenerator::new(storage);
        let result = generator
            .generate(7, 10, &PlaylistOptions::default())
            .await;
        assert!(matches!(result, Err(PlaylistError::SeedMissing(7))));
    }

    #[tokio::test]
    async fn test_seed_excluded_and_short_marked() {
        let storage = Arc::new(MemoryStorage::new());
        let seed = store_track(&storage, "/seed.mp3", 120.0, 0.5, Some("Deep House")).await;
        let other = store_track(&storage, "/a.mp3", 122.0, 0.5, Some("Deep House")).await;

        let generator = PlaylistGenerator::new(storage);
        let playlist = generator
            .generate(seed, 10, &PlaylistOptions::default())
            .await
            .unwrap();

        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.entries[0].track_id, other);
        assert!(playlist.summary.short);
    }

    #[tokio::test]
    async fn test_bpm_window_filters_and_widens_once() {
        let storage = Arc::new(MemoryStorage::new());
        let seed = store_track(&storage, "/seed.mp3", 120.0, 0.5, Some("Deep House")).await;
        // Inside the 15% window
        store_track(&storage, "/in.mp3", 130.0, 0.5, Some("Deep House")).await;
        // Outside 15% but inside the widened 22.5% window
        let widened = store_track(&storage, "/wide.mp3", 145.0, 0.5, Some("Deep House")).await;
        // Outside even the widened window
        let far = store_track(&storage, "/far.mp3", 180.0, 0.5, Some("Deep House")).await;

        let generator = PlaylistGenerator::new(storage);
        let playlist = generator
            .generate(seed, 3, &PlaylistOptions::default())
            .await
            .unwrap();

        let ids: Vec<i64> = playlist.entries.iter().map(|e| e.track_id).collect();
        assert!(ids.contains(&widened));
        assert!(!ids.contains(&far));
    }

    #[tokio::test]
    async fn test_subgenre_focus() {
        let storage = Arc::new(MemoryStorage::new());
        let seed = store_track(&storage, "/seed.mp3", 120.0, 0.5, Some("Deep House")).await;
        let house = store_track(&storage, "/h.mp3", 121.0, 0.5, Some("Deep House")).await;
        store_track(&storage, "/t.mp3", 122.0, 0.5, Some("Detroit Techno")).await;

        let generator = PlaylistGenerator::new(storage);
        let options = PlaylistOptions {
            subgenre_focus: Some("deep house".to_string()),
            ..Default::default()
        };
        let playlist = generator.generate(seed, 5, &options).await.unwrap();

        let ids: Vec<i64> = playlist.entries.iter().map(|e| e.track_id).collect();
        assert_eq!(ids, vec![house]);
    }

    #[tokio::test]
    async fn test_incompatible_genres_dropped_when_pool_allows() {
        let storage = Arc::new(MemoryStorage::new());
        let seed = store_track(&storage, "/seed.mp3", 120.0, 0.5, Some("Deep House")).await;
        for i in 0..4 {
            store_track(
                &storage,
                &format!("/house{i}.mp3"),
                120.0 + i as f64,
                0.5,
                Some("Deep House"),
            )
            .await;
        }
        let rock = store_track(&storage, "/rock.mp3", 121.0, 0.5, Some("Post-Punk")).await;

        let generator = PlaylistGenerator::new(storage);
        let playlist = generator
            .generate(seed, 4, &PlaylistOptions::default())
            .await
            .unwrap();

        assert!(playlist.entries.iter().all(|e| e.track_id != rock));
    }

    #[test]
    fn test_smoothing_reduces_adjacent_jumps() {
        let entry = |id: i64, bpm: f64| PlaylistEntry {
            track_id: id,
            bpm: Some(bpm),
            energy: Some(0.5),
            subgenre: None,
            similarity: 0.9,
            score: 0.9,
        };
        let mut entries = vec![entry(1, 120.0), entry(2, 135.0), entry(3, 122.0)];
        smooth_bpm_ordering(&mut entries, Some(120.0));
        // 120 -> 122 -> 135 jumps less than 120 -> 135 -> 122
        let ids: Vec<i64> = entries.iter().map(|e| e.track_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }
}
