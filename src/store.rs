//! Snapshot persistence: the whole tournament is written after every committed mutation.

use crate::models::Tournament;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where tournament snapshots live. A snapshot reconstructs the tournament exactly.
pub trait SnapshotStore {
    /// Snapshot for `year`, or None if nothing was saved yet.
    fn load(&self, year: i32) -> Result<Option<Tournament>, StoreError>;

    fn persist(&self, snapshot: &Tournament) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per year: `<dir>/tournament_<year>.json`.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(format!("tournament_{}.json", year))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, year: i32) -> Result<Option<Tournament>, StoreError> {
        let path = self.path_for(year);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn persist(&self, snapshot: &Tournament) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(snapshot.year);
        // Write then rename so a crash never leaves a half-written snapshot.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<i32, Tournament>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `persist` calls.
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, year: i32) -> Result<Option<Tournament>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .ok()
            .and_then(|s| s.get(&year).cloned()))
    }

    fn persist(&self, snapshot: &Tournament) -> Result<(), StoreError> {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.insert(snapshot.year, snapshot.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
