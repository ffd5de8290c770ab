//! Fixture builders

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cadence_hamms::RawFeatures;
use serde_json::json;

/// A fully-measured house track
pub fn house_features() -> RawFeatures {
    RawFeatures {
        title: Some("Night Drive".to_string()),
        artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        year: Some(1995),
        bpm: Some(124.0),
        key: Some("Am".to_string()),
        energy: Some(0.7),
        genre_hint: Some("house".to_string()),
    }
}

/// Enrichment JSON in the shape providers are asked to emit
pub fn enrichment_json(genre: &str, subgenre: &str, confidence: f64) -> String {
    json!({
        "date_verification": {
            "artist_known": false,
            "track_known": false,
            "known_original_year": null,
            "metadata_year": "1995",
            "is_likely_reissue": false,
            "verification_notes": "test fixture"
        },
        "genre": genre,
        "subgenre": subgenre,
        "mood": "driving",
        "era": "1990s",
        "tags": ["test", "fixture"],
        "confidence": confidence,
        "analysis_notes": "fixture enrichment"
    })
    .to_string()
}

/// Create an empty placeholder track file inside `dir`
pub fn temp_track(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"placeholder audio bytes").expect("fixture file created");
    path
}

/// Bump a file's mtime, invalidating its content fingerprint
pub fn touch_mtime(path: &Path) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("fixture file opens");
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .expect("mtime updated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_json_is_valid() {
        let text = enrichment_json("House", "Deep House", 0.8);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["genre"], "House");
        assert_eq!(value["confidence"], 0.8);
    }

    #[test]
    fn test_touch_changes_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_track(dir.path(), "a.mp3");
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();
        touch_mtime(&path);
        let after = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert!(after > before);
    }
}
