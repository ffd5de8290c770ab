//! The enhanced analyzer: per-track orchestration and batching

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};

use cadence_hamms::{analysis_confidence, HammsVector};
use cadence_providers::{Enricher, EnrichmentRequest, ProviderError};
use cadence_shared_config::AnalyzerConfig;
use cadence_storage::{
    AnalysisRecord, ContentFingerprint, EnrichmentRecord, Storage,
};
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::features::{FeatureExtractor, TagReader};

/// Per-call options
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Bypass the fingerprint cache and re-run the full pipeline
    pub force_reanalysis: bool,
}

/// Orchestrates feature extraction, HAMMS computation, enrichment, and
/// persistence for single tracks and batches
///
/// All collaborators are injected capabilities. The analyzer is
/// reentrant: concurrent calls on distinct tracks proceed freely, while
/// calls on the same track serialize through a per-fingerprint lock so
/// at most one provider call and one storage write are in flight per
/// track.
pub struct EnhancedAnalyzer {
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn FeatureExtractor>,
    tag_reader: Arc<dyn TagReader>,
    enricher: Option<Arc<Enricher>>,
    config: AnalyzerConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EnhancedAnalyzer {
    pub fn new(
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn FeatureExtractor>,
        tag_reader: Arc<dyn TagReader>,
        enricher: Option<Arc<Enricher>>,
        config: AnalyzerConfig,
    ) -> Self {
        if config.enable_enrichment && enricher.as_ref().map_or(true, |e| e.is_empty()) {
            warn!("Enrichment enabled but no providers configured; records will carry no semantic metadata");
        }
        Self {
            storage,
            extractor,
            tag_reader,
            enricher,
            config,
            locks: DashMap::new(),
        }
    }

    fn enrichment_active(&self) -> bool {
        self.config.enable_enrichment
            && self.enricher.as_ref().is_some_and(|e| !e.is_empty())
    }

    fn track_lock(&self, fingerprint: &ContentFingerprint) -> Arc<Mutex<()>> {
        self.locks
            .entry(fingerprint.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Analyze one track
    ///
    /// # Errors
    /// Only `FileMissing`, `Storage`, `VectorInvariant`, and `Cancelled`
    /// surface; extraction failures come back as `success = false`
    /// records and provider failures downgrade the record.
    #[instrument(skip(self, cancel), fields(path = %path.display()))]
    pub async fn analyze(
        &self,
        path: &Path,
        options: AnalyzeOptions,
        cancel: &CancellationToken,
    ) -> AnalyzerResult<AnalysisRecord> {
        let started = Instant::now();
        let path_str = path.to_string_lossy().into_owned();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| AnalyzerError::FileMissing(path_str.clone()))?;
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let fingerprint = ContentFingerprint::from_parts(&path_str, mtime_nanos, metadata.len());

        // Serialize concurrent work on the same track
        let lock = self.track_lock(&fingerprint);
        let _guard = lock.lock().await;

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let tags = self.tag_reader.read_tags(path).await;

        if !options.force_reanalysis {
            if let Some(mut cached) = self
                .storage
                .get_cached_analysis(&path_str, &fingerprint)
                .await?
            {
                debug!("Fingerprint cache hit");
                // Stored analysis, current tags
                cached.tags = tags;
                return Ok(cached);
            }
        }

        let features = match self.extractor.extract(path).await {
            Ok(features) => features,
            Err(e) => {
                warn!(error = %e, "Feature extraction failed");
                let mut record = AnalysisRecord::failure(tags, e.to_string());
                record.processing_time_ms = started.elapsed().as_millis() as u64;
                self.persist(&path_str, &fingerprint, &record).await?;
                return Ok(record);
            }
        };

        let vector = HammsVector::from_features(&features);
        // Invariant violations here are programmer errors; fail loudly
        vector.validate()?;
        let vector_confidence = analysis_confidence(&features);

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let (enrichment, ai_confidence) = if self.enrichment_active() {
            let enricher = self.enricher.as_ref().expect("enrichment_active checked");
            let request = EnrichmentRequest::from_features(&features, &vector);
            match enricher.analyze(&request, cancel).await {
                Ok(response) => {
                    let record = EnrichmentRecord::from_response(&response);
                    let confidence = record
                        .as_ref()
                        .map(|r| r.enrichment.confidence)
                        .unwrap_or(0.0);
                    (record, confidence)
                }
                Err(ProviderError::Cancelled) => return Err(AnalyzerError::Cancelled),
                Err(e) if e.is_permanent() => {
                    // Needs operator attention, but the analysis itself
                    // still completes without semantic metadata
                    error!(error = %e, "Provider configuration error, enrichment downgraded");
                    (None, 0.0)
                }
                Err(e) => {
                    warn!(error = %e, "Enrichment failed, downgrading record");
                    (None, 0.0)
                }
            }
        } else {
            (None, 0.0)
        };

        let record = AnalysisRecord {
            success: true,
            tags,
            features,
            vector: Some(vector),
            vector_confidence,
            enrichment,
            ai_confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
            error_message: None,
        };

        self.persist(&path_str, &fingerprint, &record).await?;

        info!(
            elapsed_ms = record.processing_time_ms,
            enriched = record.enrichment.is_some(),
            "Analysis complete"
        );
        Ok(record)
    }

    /// Upsert the track row and write the analysis transactionally
    async fn persist(
        &self,
        path: &str,
        fingerprint: &ContentFingerprint,
        record: &AnalysisRecord,
    ) -> AnalyzerResult<()> {
        let track = self.storage.upsert_track(path, &record.tags).await?;
        self.storage
            .write_analysis(track.id, fingerprint, record)
            .await?;
        Ok(())
    }

    /// Analyze a batch of paths
    ///
    /// Results come back in input order; per-item failures do not abort
    /// the batch. In-flight work is bounded by the configured batch
    /// concurrency, and a courtesy pause staggers items while
    /// enrichment is active.
    pub async fn batch_analyze(
        &self,
        paths: &[std::path::PathBuf],
        options: AnalyzeOptions,
        cancel: &CancellationToken,
    ) -> Vec<AnalyzerResult<AnalysisRecord>> {
        if paths.is_empty() {
            return Vec::new();
        }

        info!(count = paths.len(), "Starting batch analysis");
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let pause = Duration::from_millis(self.config.batch_pause_ms);
        let enrichment_active = self.enrichment_active();

        let results: Vec<AnalyzerResult<AnalysisRecord>> =
            stream::iter(paths.iter().enumerate())
                .map(|(index, path)| {
                    let semaphore = Arc::clone(&semaphore);
                    async move {
                        let _permit = semaphore.acquire().await.expect("semaphore never closed");
                        if index > 0 && enrichment_active {
                            tokio::select! {
                                _ = tokio::time::sleep(pause) => {}
                                _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
                            }
                        }
                        self.analyze(path, options, cancel).await
                    }
                })
                .buffered(self.config.batch_concurrency.max(1))
                .collect()
                .await;

        let succeeded = results
            .iter()
            .filter(|r| r.as_ref().is_ok_and(|rec| rec.success))
            .count();
        info!(
            total = results.len(),
            succeeded,
            "Batch analysis complete"
        );
        results
    }
}
