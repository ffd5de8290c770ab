//! Raw feature extraction from audio files
//!
//! The extractor here works from embedded tags via lofty: titles,
//! artists, and — when a DJ tool has written them — tempo and initial
//! key. A PCM-level analyzer (decoder, onset detection) is an external
//! collaborator; when it is absent, BPM and energy stay unmeasured and
//! the vector confidence reflects that.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cadence_hamms::RawFeatures;
use cadence_storage::BasicTags;
use lofty::{Accessor, ItemKey, Probe, TaggedFileExt};
use thiserror::Error;
use tracing::debug;

/// Feature extraction failure
#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    /// The file could not be opened or parsed as audio
    #[error("failed to read audio file '{path}': {reason}")]
    Unreadable { path: String, reason: String },
}

/// Produces raw features for a track
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Extract features; absent values stay `None`, never defaults
    async fn extract(&self, path: &Path) -> Result<RawFeatures, ExtractError>;
}

/// Reads basic tags, tolerating files with none
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Best-effort tag read; an unreadable file yields the filename as
    /// the title and nothing else
    async fn read_tags(&self, path: &Path) -> BasicTags;
}

/// Tag-based extractor and reader backed by lofty
#[derive(Debug, Clone, Default)]
pub struct TagFeatureExtractor;

impl TagFeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Blocking lofty read; runs on the blocking pool
    fn read_file(path: &PathBuf) -> Result<(BasicTags, Option<f64>, Option<String>), ExtractError> {
        let unreadable = |reason: String| ExtractError::Unreadable {
            path: path.to_string_lossy().into_owned(),
            reason,
        };

        let tagged_file = Probe::open(path)
            .map_err(|e| unreadable(e.to_string()))?
            .read()
            .map_err(|e| unreadable(e.to_string()))?;

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let Some(tag) = tag else {
            return Ok((filename_tags(path), None, None));
        };

        let tags = BasicTags {
            title: tag
                .title()
                .map(|s| s.into_owned())
                .or_else(|| filename_title(path)),
            artist: tag.artist().map(|s| s.into_owned()),
            album: tag.album().map(|s| s.into_owned()),
            year: tag.year().map(|y| y as i32),
            genre: tag.genre().map(|g| g.into_owned()),
        };

        let bpm = tag
            .get_string(&ItemKey::Bpm)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|b| *b > 0.0);
        let key = tag
            .get_string(&ItemKey::InitialKey)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok((tags, bpm, key))
    }
}

fn filename_title(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

fn filename_tags(path: &Path) -> BasicTags {
    BasicTags {
        title: filename_title(path),
        ..Default::default()
    }
}

#[async_trait]
impl FeatureExtractor for TagFeatureExtractor {
    async fn extract(&self, path: &Path) -> Result<RawFeatures, ExtractError> {
        let owned = path.to_path_buf();
        let (tags, bpm, key) = tokio::task::spawn_blocking(move || Self::read_file(&owned))
            .await
            .map_err(|e| ExtractError::Unreadable {
                path: path.to_string_lossy().into_owned(),
                reason: format!("extraction task failed: {}", e),
            })??;

        debug!(
            path = %path.display(),
            has_bpm = bpm.is_some(),
            has_key = key.is_some(),
            "Extracted tag features"
        );

        Ok(RawFeatures {
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            year: tags.year,
            bpm,
            key,
            // Energy needs decoded PCM; the decoder is a collaborator
            energy: None,
            genre_hint: tags.genre,
        })
    }
}

#[async_trait]
impl TagReader for TagFeatureExtractor {
    async fn read_tags(&self, path: &Path) -> BasicTags {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || Self::read_file(&owned)).await {
            Ok(Ok((tags, _, _))) => tags,
            _ => filename_tags(path),
        }
    }
}
