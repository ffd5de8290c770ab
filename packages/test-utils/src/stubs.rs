//! Scripted in-process collaborators

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cadence_analyzer::{ExtractError, FeatureExtractor, TagReader};
use cadence_hamms::RawFeatures;
use cadence_providers::{
    Enrichment, EnrichmentRequest, Provider, ProviderError, ProviderResponse, ProviderResult,
};
use cadence_storage::BasicTags;
use tokio_util::sync::CancellationToken;

/// One scripted provider outcome
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Parsed enrichment with the given genre and confidence
    Success { genre: String, confidence: f64 },
    /// Fallback-marked enrichment (simulates failed JSON recovery)
    Fallback,
    /// Transient failure after exhausted retries
    Transient,
    /// Permanent failure (bad credentials)
    Permanent,
}

/// In-process [`Provider`] with a scripted outcome sequence
///
/// Counts its invocations, which is how tests assert the cache-hit
/// property: a second analysis of an unchanged file performs zero
/// provider calls.
pub struct ScriptedProvider {
    name: &'static str,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    default: ScriptedOutcome,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Provider that repeats one outcome forever
    pub fn repeating(name: &'static str, outcome: ScriptedOutcome) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            default: outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider that plays a sequence, then repeats the last entry
    pub fn sequence(name: &'static str, outcomes: Vec<ScriptedOutcome>) -> Self {
        let default = outcomes
            .last()
            .cloned()
            .unwrap_or(ScriptedOutcome::Transient);
        Self {
            name,
            script: Mutex::new(outcomes.into()),
            default,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeeds with the given genre
    pub fn succeeding(name: &'static str, genre: &str) -> Self {
        Self::repeating(
            name,
            ScriptedOutcome::Success {
                genre: genre.to_string(),
                confidence: 0.8,
            },
        )
    }

    /// Always fails transiently
    pub fn failing(name: &'static str) -> Self {
        Self::repeating(name, ScriptedOutcome::Transient)
    }

    /// How many times `analyze` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn analyze(
        &self,
        _request: &EnrichmentRequest,
        _cancel: &CancellationToken,
    ) -> ProviderResult<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_outcome() {
            ScriptedOutcome::Success { genre, confidence } => Ok(ProviderResponse {
                success: true,
                enrichment: Some(Enrichment {
                    genre: Some(genre.clone()),
                    subgenre: Some(genre),
                    mood: Some("energetic".to_string()),
                    era: Some("1990s".to_string()),
                    tags: vec!["scripted".to_string()],
                    confidence,
                    date_verification: None,
                    analysis_notes: None,
                }),
                fallback: false,
                raw_response: "{}".to_string(),
                provider: self.name.to_string(),
                model: "scripted".to_string(),
                elapsed_ms: 1,
                prompt_tokens: Some(100),
                completion_tokens: Some(40),
                cost_estimate: Some(0.0001),
                error_message: None,
            }),
            ScriptedOutcome::Fallback => Ok(ProviderResponse {
                success: true,
                enrichment: Some(Enrichment {
                    genre: Some("electronic".to_string()),
                    confidence: 0.3,
                    analysis_notes: Some("fallback classification".to_string()),
                    ..Default::default()
                }),
                fallback: true,
                raw_response: "unparseable".to_string(),
                provider: self.name.to_string(),
                model: "scripted".to_string(),
                elapsed_ms: 1,
                prompt_tokens: Some(100),
                completion_tokens: Some(10),
                cost_estimate: Some(0.0001),
                error_message: None,
            }),
            ScriptedOutcome::Transient => Err(ProviderError::RetriesExhausted {
                attempts: 3,
                last_error: "connection timed out".to_string(),
            }),
            ScriptedOutcome::Permanent => {
                Err(ProviderError::AuthFailed("invalid credentials".to_string()))
            }
        }
    }

    async fn test_connection(&self) -> ProviderResult<()> {
        Ok(())
    }

    fn cost_estimate(&self, _prompt_tokens: u32, _completion_tokens: u32) -> f64 {
        0.0001
    }
}

/// Extractor returning fixed features, or a scripted failure
pub struct StubExtractor {
    features: Option<RawFeatures>,
    calls: AtomicUsize,
}

impl StubExtractor {
    /// Always yields the given features
    pub fn with_features(features: RawFeatures) -> Self {
        Self {
            features: Some(features),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails extraction (undecodable file)
    pub fn failing() -> Self {
        Self {
            features: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `extract` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureExtractor for StubExtractor {
    async fn extract(&self, path: &Path) -> Result<RawFeatures, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.features {
            Some(features) => Ok(features.clone()),
            None => Err(ExtractError::Unreadable {
                path: path.to_string_lossy().into_owned(),
                reason: "scripted decode failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TagReader for StubExtractor {
    async fn read_tags(&self, path: &Path) -> BasicTags {
        match &self.features {
            Some(features) => BasicTags {
                title: features.title.clone(),
                artist: features.artist.clone(),
                album: features.album.clone(),
                year: features.year,
                genre: features.genre_hint.clone(),
            },
            None => BasicTags {
                title: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string),
                ..Default::default()
            },
        }
    }
}
