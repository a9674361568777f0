//! # Snapshot Persistence
//!
//! Events and participants survive restarts as a single JSON document.
//! Writes go to a sibling temp file that is then renamed over the target, so
//! a crash mid-write leaves the previous snapshot intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use eai_core::SubjectId;

use crate::error::SnapshotError;
use crate::events::Event;
use crate::participants::Participant;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Events in creation order.
    pub events: Vec<Event>,
    /// Participants keyed by subject.
    pub participants: BTreeMap<SubjectId, Participant>,
}

/// File-backed snapshot location.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Store snapshots at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. `Ok(None)` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(Some(snapshot))
    }

    /// Write a snapshot produced by `capture`.
    ///
    /// `capture` runs while the write lock is held, so the last completed
    /// write always reflects every mutation that finished before it began.
    pub fn save_with(&self, capture: impl FnOnce() -> Snapshot) -> Result<(), SnapshotError> {
        let _guard = self.write_lock.lock();
        let snapshot = capture();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
