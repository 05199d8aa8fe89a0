//! Sync-assist snapshots.
//!
//! A snapshot lists every height known to carry at least one SCP message. A cold sync
//! trusts the heights missing from that list and only fetches the listed ones, which
//! shortens the initial scan from hundreds of thousands of blocks to a few thousand.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Sync-assist snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed sync-assist snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sync-assist snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sorted, de-duplicated heights that produced chain messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncAssistSnapshot {
    heights: Vec<u32>,
}

impl SyncAssistSnapshot {
    pub fn new(heights: impl IntoIterator<Item = u32>) -> Self {
        let mut heights = heights.into_iter().collect::<Vec<_>>();
        heights.sort_unstable();
        heights.dedup();
        Self { heights }
    }

    pub fn heights(&self) -> &[u32] {
        &self.heights
    }

    pub fn max_height(&self) -> Option<u32> {
        self.heights.last().copied()
    }

    pub fn contains(&self, height: u32) -> bool {
        self.heights.binary_search(&height).is_ok()
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// Persistence for [`SyncAssistSnapshot`].
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, `None` if there is none yet.
    fn load(&self) -> Result<Option<SyncAssistSnapshot>, SnapshotError>;

    fn save(&self, snapshot: &SyncAssistSnapshot) -> Result<(), SnapshotError>;
}

/// Stores the snapshot as a JSON array in `<data-dir>/sync-assist.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub const FILE_NAME: &'static str = "sync-assist.json";

    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<SyncAssistSnapshot>, SnapshotError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let heights: Vec<u32> = serde_json::from_slice(&bytes)?;

        Ok(Some(SyncAssistSnapshot::new(heights)))
    }

    fn save(&self, snapshot: &SyncAssistSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Replace atomically, a reader never sees a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}
