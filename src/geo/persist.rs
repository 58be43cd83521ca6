//! On-disk persistence of the resolution cache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

use super::cache::CacheSnapshotEntry;

/// File layout of a persisted cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    saved_at: SystemTime,
    entries: Vec<CacheSnapshotEntry>,
}

/// Loads a cache snapshot from disk.
///
/// A missing file is an empty snapshot, not an error.
pub fn load_cache_file(path: &Path) -> Result<Vec<CacheSnapshotEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).context("Failed to read cache file")?;
    let file: CacheFile = serde_json::from_str(&content).context("Failed to parse cache file")?;

    log::debug!(
        "Loaded {} cached resolutions saved at {:?}",
        file.entries.len(),
        file.saved_at
    );
    Ok(file.entries)
}

/// Saves a cache snapshot to disk, creating parent directories as needed.
pub fn save_cache_file(path: &Path, entries: Vec<CacheSnapshotEntry>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }

    let file = CacheFile {
        saved_at: SystemTime::now(),
        entries,
    };
    let content = serde_json::to_string_pretty(&file).context("Failed to serialize cache")?;
    std::fs::write(path, content).context("Failed to write cache file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entries = load_cache_file(&temp_dir.path().join("absent.json")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("cache.json");
        let entries = vec![
            CacheSnapshotEntry {
                address: "1.1.1.1".to_string(),
                value: Some(
                    Coordinate::new(-33.494, 143.2104)
                        .unwrap()
                        .with_place(Some("Australia".into()), None),
                ),
                expires_at: SystemTime::now() + Duration::from_secs(600),
            },
            CacheSnapshotEntry {
                address: "192.168.1.1".to_string(),
                value: None,
                expires_at: SystemTime::now() + Duration::from_secs(600),
            },
        ];

        save_cache_file(&path, entries.clone()).expect("save should succeed");
        let loaded = load_cache_file(&path).expect("load should succeed");
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, "{not json").expect("Failed to write corrupted data");

        let err = load_cache_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse cache file"));
    }
}
