//! Single-file persistence of the latest summary.
//!
//! The file holds one pretty-printed JSON [`Summary`] and is overwritten
//! wholesale on every accepted update. Writes go to a sibling temporary
//! file first and are renamed into place, so a crash mid-write leaves the
//! previous snapshot intact.

use std::path::{Path, PathBuf};

use ballot_types::Summary;
use tracing::{debug, info, warn};

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file exists but could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot file is not a valid summary.
    #[error("snapshot {path} is invalid: {reason}")]
    Decode {
        /// File that was read.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The snapshot could not be written.
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        /// File that was written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The summary could not be serialized.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Location of the persisted snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Bind a store to a file path. Nothing is touched until load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted snapshot.
    ///
    /// Returns `Ok(None)` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] on I/O failure and
    /// [`StoreError::Decode`] if the file is not a well-formed, internally
    /// consistent summary.
    pub async fn load(&self) -> Result<Option<Summary>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot on disk");
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let summary: Summary = serde_json::from_str(&raw).map_err(|e| StoreError::Decode {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if !summary.is_consistent() {
            return Err(StoreError::Decode {
                path: self.path.clone(),
                reason: "totals do not match regions".to_owned(),
            });
        }

        Ok(Some(summary))
    }

    /// Best-effort startup seed: any load failure is logged and treated as
    /// "no snapshot".
    pub async fn load_seed(&self) -> Option<Summary> {
        match self.load().await {
            Ok(Some(summary)) => {
                info!(
                    path = %self.path.display(),
                    timestamp = summary.timestamp,
                    regions = summary.regions.len(),
                    "Loaded cached summary"
                );
                Some(summary)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring unusable snapshot");
                None
            }
        }
    }

    /// Overwrite the snapshot with `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] or [`StoreError::Write`].
    pub async fn save(&self, summary: &Summary) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(summary)?;
        let tmp = self.temp_path();

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&tmp, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;

        info!(path = %self.path.display(), timestamp = summary.timestamp, "Snapshot saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ballot_types::RegionSummary;
    use chrono::Utc;

    use super::*;

    fn summary(timestamp: i64) -> Summary {
        let mut region = RegionSummary::new("pomorskie".to_owned());
        region.record(2, 10, 20);
        Summary::from_regions(timestamp, vec![region], Utc::now())
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache.json"));
        assert!(store.load().await.unwrap().is_none());
        assert!(store.load_seed().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_restores_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache.json"));
        let saved = summary(42);

        store.save(&saved).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, saved);
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache.json"));

        store.save(&summary(1)).await.unwrap();
        store.save(&summary(2)).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/deeper/cache.json"));
        store.save(&summary(7)).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_decode_error_and_no_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SnapshotStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Decode { .. })));
        assert!(store.load_seed().await.is_none());
    }

    #[tokio::test]
    async fn inconsistent_totals_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut bad = summary(3);
        bad.total_a = 999;
        std::fs::write(&path, serde_json::to_string(&bad).unwrap()).unwrap();

        let store = SnapshotStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Decode { .. })));
    }
}
