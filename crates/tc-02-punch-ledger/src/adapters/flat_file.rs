//! # Flat-File Record Store
//!
//! One directory per node:
//!
//! ```text
//! <dir>/badges.json            roster, keyed by badge number
//! <dir>/punch_data_<badge>.json punch list, sorted by ts_in
//! ```
//!
//! Files are pretty-printed with four-space indentation and sorted keys so
//! they stay diffable by hand. Every write goes through a temp file and a
//! rename.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use shared_types::{BadgeRoster, PunchRecord};
use tracing::{debug, info};

use crate::domain::{sort_history, StoreError};
use crate::ports::RecordStore;

/// Record store backed by JSON files in one directory.
pub struct FlatFileRecordStore {
    dir: PathBuf,
}

impl FlatFileRecordStore {
    pub const BADGES_FILE: &'static str = "badges.json";

    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "[ledger] Flat-file record store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn punch_path(&self, badge: &str) -> Result<PathBuf, StoreError> {
        if !is_storable(badge) {
            return Err(StoreError::InvalidBadge(badge.to_string()));
        }
        Ok(self.dir.join(format!("punch_data_{badge}.json")))
    }

    fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let corrupt = |e: serde_json::Error| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        // Going through Value sorts object keys.
        let value = serde_json::to_value(value).map_err(corrupt)?;
        let mut bytes = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser).map_err(corrupt)?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        debug!(path = %path.display(), bytes = bytes.len(), "[ledger] Record file written");
        Ok(())
    }
}

/// Badge numbers become part of a file name.
fn is_storable(badge: &str) -> bool {
    !badge.is_empty()
        && !badge.starts_with('.')
        && badge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl RecordStore for FlatFileRecordStore {
    fn read_punches(&self, badge: &str) -> Result<Vec<PunchRecord>, StoreError> {
        let path = self.punch_path(badge)?;
        self.read_json(&path)
    }

    fn write_punches(&self, badge: &str, punches: &[PunchRecord]) -> Result<(), StoreError> {
        let path = self.punch_path(badge)?;
        let mut sorted = punches.to_vec();
        sort_history(&mut sorted);
        self.write_json(&path, &sorted)
    }

    fn read_badges(&self) -> Result<BadgeRoster, StoreError> {
        self.read_json(&self.dir.join(Self::BADGES_FILE))
    }

    fn write_badges(&self, roster: &BadgeRoster) -> Result<(), StoreError> {
        self.write_json(&self.dir.join(Self::BADGES_FILE), roster)
    }
}
