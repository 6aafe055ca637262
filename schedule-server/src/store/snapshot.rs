//! Disk snapshot of the store contents.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::domain::{Location, Schedule, Train};

use super::error::StoreError;

/// The full data set held by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub trains: Vec<Train>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

/// Snapshot data with metadata, as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    /// Unix timestamp when the snapshot was written.
    saved_at_secs: u64,
    data: Snapshot,
}

/// A JSON snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot.
    ///
    /// Returns `Ok(None)` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::SnapshotIo {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };

        let envelope: SnapshotEnvelope =
            serde_json::from_str(&contents).map_err(|e| StoreError::SnapshotCorrupt {
                message: format!("{}: {}", self.path.display(), e),
            })?;

        Ok(Some(envelope.data))
    }

    /// Save the snapshot.
    ///
    /// Writes to a sibling temporary file and renames it over the target, so
    /// readers never observe a partial file. Creates parent directories if
    /// they don't exist.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| StoreError::SnapshotIo {
                message: "system time before unix epoch".to_string(),
            })?
            .as_secs();

        let envelope = SnapshotEnvelope {
            saved_at_secs: now,
            data: snapshot.clone(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::SnapshotIo {
                message: format!("failed to create snapshot directory: {}", e),
            })?;
        }

        let json =
            serde_json::to_string_pretty(&envelope).map_err(|e| StoreError::SnapshotIo {
                message: format!("failed to serialize snapshot: {}", e),
            })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::SnapshotIo {
            message: format!("failed to write {}: {}", tmp.display(), e),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::SnapshotIo {
            message: format!("failed to replace {}: {}", self.path.display(), e),
        })?;

        Ok(())
    }

    /// Get the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
