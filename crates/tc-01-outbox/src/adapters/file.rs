//! # JSON File Snapshot Store
//!
//! Persists the outbox as a JSON array in `<dir>/outbox.json`.
//!
//! Writes go to a temp file that is fsynced and renamed over the target, so a
//! crash leaves either the old or the new snapshot, never a torn one. The
//! directory is held with an exclusive `fs2` lock for as long as the store
//! lives: two processes sharing one outbox would both publish and confirm
//! the same entries.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use crate::domain::{OutboxEntry, OutboxError};
use crate::ports::SnapshotStore;

/// File-backed snapshot store.
pub struct JsonFileSnapshotStore {
    path: PathBuf,
    /// Kept open to hold the directory lock; released on drop.
    _lock: File,
}

impl JsonFileSnapshotStore {
    /// Snapshot file name.
    pub const FILE_NAME: &'static str = "outbox.json";

    /// Lock file name.
    pub const LOCK_FILE: &'static str = "outbox.lock";

    /// Open (creating if needed) the outbox in `dir` and lock it.
    ///
    /// # Errors
    ///
    /// Returns `OutboxError::Locked` if another process holds the directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, OutboxError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let lock_path = dir.join(Self::LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| OutboxError::Locked { path: lock_path })?;

        let path = dir.join(Self::FILE_NAME);
        info!(path = %path.display(), "[outbox] Snapshot store opened");
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<OutboxEntry> =
            serde_json::from_slice(&bytes).map_err(|e| OutboxError::Corrupt(e.to_string()))?;
        debug!(entries = entries.len(), "[outbox] Snapshot loaded");
        Ok(entries)
    }

    fn save(&self, entries: &[OutboxEntry]) -> Result<(), OutboxError> {
        let bytes =
            serde_json::to_vec(entries).map_err(|e| OutboxError::Persistence(e.to_string()))?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(entries = entries.len(), bytes = bytes.len(), "[outbox] Snapshot saved");
        Ok(())
    }
}
