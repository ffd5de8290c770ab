//! SQLite-backed storage

use async_trait::async_trait;
use cadence_hamms::{HammsVector, RawFeatures};
use cadence_providers::{DateVerification, Enrichment};
use cadence_shared_config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::fingerprint::ContentFingerprint;
use crate::types::{
    AnalysisRecord, AnalysisSummary, BasicTags, EnrichmentRecord, Track, VectorFilter,
    VectorSummary,
};
use crate::Storage;

/// SQLite implementation of [`Storage`]
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect using the shared database configuration
    pub async fn from_config(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Open an isolated in-memory database (used by tests)
    pub async fn connect_in_memory() -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Create the schema if it does not exist yet
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                title TEXT,
                artist TEXT,
                album TEXT,
                year INTEGER,
                genre TEXT,
                fingerprint TEXT,
                analysis_error TEXT,
                analysis_time_ms INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hamms_vectors (
                track_id INTEGER PRIMARY KEY REFERENCES tracks(id),
                vector TEXT NOT NULL,
                dimensions TEXT NOT NULL,
                features TEXT NOT NULL,
                confidence REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enrichments (
                track_id INTEGER PRIMARY KEY REFERENCES tracks(id),
                genre TEXT,
                subgenre TEXT,
                mood TEXT,
                era TEXT,
                tags TEXT NOT NULL,
                confidence REAL NOT NULL,
                date_verification TEXT,
                analysis_notes TEXT,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                raw_response TEXT NOT NULL,
                prompt_tokens INTEGER,
                completion_tokens INTEGER,
                cost_estimate REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn decode_json<T: serde::de::DeserializeOwned>(
        track_id: i64,
        payload: &str,
    ) -> StorageResult<T> {
        serde_json::from_str(payload).map_err(|e| StorageError::CorruptPayload {
            track_id,
            reason: e.to_string(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct TrackRow {
    id: i64,
    path: String,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    year: Option<i32>,
    genre: Option<String>,
    fingerprint: Option<String>,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        Track {
            id: row.id,
            path: row.path,
            tags: BasicTags {
                title: row.title,
                artist: row.artist,
                album: row.album,
                year: row.year,
                genre: row.genre,
            },
            fingerprint: row.fingerprint,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CachedAnalysisRow {
    id: i64,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    year: Option<i32>,
    genre: Option<String>,
    analysis_error: Option<String>,
    analysis_time_ms: i64,
    vector: Option<String>,
    features: Option<String>,
    confidence: Option<f64>,
    e_genre: Option<String>,
    e_subgenre: Option<String>,
    e_mood: Option<String>,
    e_era: Option<String>,
    e_tags: Option<String>,
    e_confidence: Option<f64>,
    e_date_verification: Option<String>,
    e_analysis_notes: Option<String>,
    e_provider: Option<String>,
    e_model: Option<String>,
    e_raw_response: Option<String>,
    e_prompt_tokens: Option<i64>,
    e_completion_tokens: Option<i64>,
    e_cost_estimate: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct VectorRow {
    track_id: i64,
    vector: String,
    features: String,
    subgenre: Option<String>,
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_track_by_path(&self, path: &str) -> StorageResult<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as(
            "SELECT id, path, title, artist, album, year, genre, fingerprint
             FROM tracks WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Track::from))
    }

    async fn get_track(&self, track_id: i64) -> StorageResult<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as(
            "SELECT id, path, title, artist, album, year, genre, fingerprint
             FROM tracks WHERE id = ?",
        )
        .bind(track_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Track::from))
    }

    #[instrument(skip(self, tags))]
    async fn upsert_track(&self, path: &str, tags: &BasicTags) -> StorageResult<Track> {
        sqlx::query(
            r#"
            INSERT INTO tracks (path, title, artist, album, year, genre)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                year = excluded.year,
                genre = excluded.genre,
                updated_at = datetime('now')
            "#,
        )
        .bind(path)
        .bind(&tags.title)
        .bind(&tags.artist)
        .bind(&tags.album)
        .bind(tags.year)
        .bind(&tags.genre)
        .execute(&self.pool)
        .await?;

        self.get_track_by_path(path)
            .await?
            .ok_or(StorageError::TrackNotFound(0))
    }

    #[instrument(skip(self, fingerprint))]
    async fn get_cached_analysis(
        &self,
        path: &str,
        fingerprint: &ContentFingerprint,
    ) -> StorageResult<Option<AnalysisRecord>> {
        let row: Option<CachedAnalysisRow> = sqlx::query_as(
            r#"
            SELECT
                t.id, t.title, t.artist, t.album, t.year, t.genre,
                t.analysis_error, t.analysis_time_ms,
                v.vector, v.features, v.confidence,
                e.genre AS e_genre,
                e.subgenre AS e_subgenre,
                e.mood AS e_mood,
                e.era AS e_era,
                e.tags AS e_tags,
                e.confidence AS e_confidence,
                e.date_verification AS e_date_verification,
                e.analysis_notes AS e_analysis_notes,
                e.provider AS e_provider,
                e.model AS e_model,
                e.raw_response AS e_raw_response,
                e.prompt_tokens AS e_prompt_tokens,
                e.completion_tokens AS e_completion_tokens,
                e.cost_estimate AS e_cost_estimate
            FROM tracks t
            LEFT JOIN hamms_vectors v ON v.track_id = t.id
            LEFT JOIN enrichments e ON e.track_id = t.id
            WHERE t.path = ? AND t.fingerprint = ?
            "#,
        )
        .bind(path)
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        // A track row without any analysis outcome is not a cache hit
        if row.vector.is_none() && row.analysis_error.is_none() {
            return Ok(None);
        }

        let track_id = row.id;
        let vector: Option<HammsVector> = row
            .vector
            .as_deref()
            .map(|v| Self::decode_json(track_id, v))
            .transpose()?;
        let features: RawFeatures = row
            .features
            .as_deref()
            .map(|f| Self::decode_json(track_id, f))
            .transpose()?
            .unwrap_or_default();

        let enrichment = match (row.e_provider, row.e_model) {
            (Some(provider), Some(model)) => {
                let tags: Vec<String> = row
                    .e_tags
                    .as_deref()
                    .map(|t| Self::decode_json(track_id, t))
                    .transpose()?
                    .unwrap_or_default();
                let date_verification: Option<DateVerification> = row
                    .e_date_verification
                    .as_deref()
                    .map(|d| Self::decode_json(track_id, d))
                    .transpose()?;
                Some(EnrichmentRecord {
                    enrichment: Enrichment {
                        genre: row.e_genre,
                        subgenre: row.e_subgenre,
                        mood: row.e_mood,
                        era: row.e_era,
                        tags,
                        confidence: row.e_confidence.unwrap_or(0.0),
                        date_verification,
                        analysis_notes: row.e_analysis_notes,
                    },
                    provider,
                    model,
                    raw_response: row.e_raw_response.unwrap_or_default(),
                    prompt_tokens: row.e_prompt_tokens.map(|t| t as u32),
                    completion_tokens: row.e_completion_tokens.map(|t| t as u32),
                    cost_estimate: row.e_cost_estimate,
                })
            }
            _ => None,
        };

        let ai_confidence = enrichment
            .as_ref()
            .map(|e| e.enrichment.confidence)
            .unwrap_or(0.0);

        Ok(Some(AnalysisRecord {
            success: row.analysis_error.is_none() && vector.is_some(),
            tags: BasicTags {
                title: row.title,
                artist: row.artist,
                album: row.album,
                year: row.year,
                genre: row.genre,
            },
            features,
            vector,
            vector_confidence: row.confidence.unwrap_or(0.0),
            enrichment,
            ai_confidence,
            processing_time_ms: row.analysis_time_ms as u64,
            error_message: row.analysis_error,
        }))
    }

    #[instrument(skip(self, fingerprint, record))]
    async fn write_analysis(
        &self,
        track_id: i64,
        fingerprint: &ContentFingerprint,
        record: &AnalysisRecord,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tracks SET
                fingerprint = ?,
                analysis_error = ?,
                analysis_time_ms = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(fingerprint.as_str())
        .bind(&record.error_message)
        .bind(record.processing_time_ms as i64)
        .bind(track_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::TrackNotFound(track_id));
        }

        match &record.vector {
            Some(vector) => {
                let dimensions: serde_json::Map<String, serde_json::Value> = vector
                    .dimension_scores()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value.into()))
                    .collect();
                sqlx::query(
                    r#"
                    INSERT INTO hamms_vectors (track_id, vector, dimensions, features, confidence)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(track_id) DO UPDATE SET
                        vector = excluded.vector,
                        dimensions = excluded.dimensions,
                        features = excluded.features,
                        confidence = excluded.confidence
                    "#,
                )
                .bind(track_id)
                .bind(serde_json::to_string(vector).expect("vector serializes"))
                .bind(
                    serde_json::to_string(&serde_json::Value::Object(dimensions))
                        .expect("dimensions serialize"),
                )
                .bind(serde_json::to_string(&record.features).expect("features serialize"))
                .bind(record.vector_confidence)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM hamms_vectors WHERE track_id = ?")
                    .bind(track_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        match &record.enrichment {
            Some(enrichment) => {
                sqlx::query(
                    r#"
                    INSERT INTO enrichments (
                        track_id, genre, subgenre, mood, era, tags, confidence,
                        date_verification, analysis_notes, provider, model,
                        raw_response, prompt_tokens, completion_tokens, cost_estimate
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(track_id) DO UPDATE SET
                        genre = excluded.genre,
                        subgenre = excluded.subgenre,
                        mood = excluded.mood,
                        era = excluded.era,
                        tags = excluded.tags,
                        confidence = excluded.confidence,
                        date_verification = excluded.date_verification,
                        analysis_notes = excluded.analysis_notes,
                        provider = excluded.provider,
                        model = excluded.model,
                        raw_response = excluded.raw_response,
                        prompt_tokens = excluded.prompt_tokens,
                        completion_tokens = excluded.completion_tokens,
                        cost_estimate = excluded.cost_estimate
                    "#,
                )
                .bind(track_id)
                .bind(&enrichment.enrichment.genre)
                .bind(&enrichment.enrichment.subgenre)
                .bind(&enrichment.enrichment.mood)
                .bind(&enrichment.enrichment.era)
                .bind(
                    serde_json::to_string(&enrichment.enrichment.tags).expect("tags serialize"),
                )
                .bind(enrichment.enrichment.confidence)
                .bind(
                    enrichment
                        .enrichment
                        .date_verification
                        .as_ref()
                        .map(|d| serde_json::to_string(d).expect("date verification serializes")),
                )
                .bind(&enrichment.enrichment.analysis_notes)
                .bind(&enrichment.provider)
                .bind(&enrichment.model)
                .bind(&enrichment.raw_response)
                .bind(enrichment.prompt_tokens.map(i64::from))
                .bind(enrichment.completion_tokens.map(i64::from))
                .bind(enrichment.cost_estimate)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM enrichments WHERE track_id = ?")
                    .bind(track_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        debug!(track_id, "Analysis written");
        Ok(())
    }

    async fn list_vectors(
        &self,
        filter: Option<&VectorFilter>,
    ) -> StorageResult<Vec<VectorSummary>> {
        let subgenre = filter.and_then(|f| f.subgenre.as_deref());
        let rows: Vec<VectorRow> = match subgenre {
            Some(subgenre) => {
                sqlx::query_as(
                    r#"
                    SELECT v.track_id, v.vector, v.features, e.subgenre
                    FROM hamms_vectors v
                    LEFT JOIN enrichments e ON e.track_id = v.track_id
                    WHERE lower(e.subgenre) = lower(?)
                    ORDER BY v.track_id
                    "#,
                )
                .bind(subgenre)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT v.track_id, v.vector, v.features, e.subgenre
                    FROM hamms_vectors v
                    LEFT JOIN enrichments e ON e.track_id = v.track_id
                    ORDER BY v.track_id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| {
                let vector: HammsVector = Self::decode_json(row.track_id, &row.vector)?;
                let features: RawFeatures = Self::decode_json(row.track_id, &row.features)?;
                Ok(VectorSummary {
                    track_id: row.track_id,
                    vector,
                    bpm: features.bpm,
                    energy: features.energy,
                    subgenre: row.subgenre,
                })
            })
            .collect()
    }

    async fn get_vector(&self, track_id: i64) -> StorageResult<Option<HammsVector>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT vector FROM hamms_vectors WHERE track_id = ?")
                .bind(track_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(payload,)| Self::decode_json(track_id, &payload))
            .transpose()
    }

    async fn analysis_summary(&self) -> StorageResult<AnalysisSummary> {
        let (total_tracks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;
        let (total_analyzed,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hamms_vectors")
            .fetch_one(&self.pool)
            .await?;
        let (total_enriched,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM enrichments")
            .fetch_one(&self.pool)
            .await?;
        let top_genres: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT genre, COUNT(*) AS n FROM enrichments
            WHERE genre IS NOT NULL
            GROUP BY genre
            ORDER BY n DESC, genre ASC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

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
