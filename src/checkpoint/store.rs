//! Checkpoint persistence.
//!
//! Epistemic foundation:
//! - K_i: State is persisted to disk atomically (write-then-rename)
//! - B_i: Checkpoint file may not exist or be corrupt → Option
//! - I^B: Crash during write → readers still see the previous snapshot

use super::Checkpoint;
use crate::models::{MatchFetchError, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Storage for the single run snapshot.
///
/// K_i: One active run per store; saves are whole-snapshot overwrites.
pub trait CheckpointStore {
    /// Load the snapshot, or `None` if absent or unreadable.
    fn load(&self) -> Option<Checkpoint>;

    /// Replace the snapshot.
    fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Delete the snapshot. Deleting an absent snapshot succeeds.
    fn clear(&self) -> Result<()>;
}

/// Checkpoint stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a checkpoint file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn read(&self) -> std::result::Result<Checkpoint, String> {
        let file = File::open(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| e.to_string())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Option<Checkpoint> {
        if !self.exists() {
            return None;
        }
        match self.read() {
            Ok(mut checkpoint) => {
                checkpoint.normalize();
                debug!(
                    path = %self.path.display(),
                    records = checkpoint.fetched_count(),
                    enriched = checkpoint.enriched_count(),
                    "Checkpoint loaded"
                );
                Some(checkpoint)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable checkpoint");
                None
            }
        }
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(&dir)
            .map_err(|e| MatchFetchError::persistence("creating checkpoint dir", e))?;

        // Temp file must share the target's filesystem for the rename to be atomic
        let temp = NamedTempFile::new_in(&dir)
            .map_err(|e| MatchFetchError::persistence("creating temp checkpoint", e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, checkpoint).map_err(|e| {
                MatchFetchError::persistence("serializing checkpoint", e.into())
            })?;
            writer
                .flush()
                .map_err(|e| MatchFetchError::persistence("flushing checkpoint", e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| MatchFetchError::persistence("syncing checkpoint", e))?;

        temp.persist(&self.path)
            .map_err(|e| MatchFetchError::persistence("renaming checkpoint", e.error))?;

        debug!(
            records = checkpoint.fetched_count(),
            enriched = checkpoint.enriched_count(),
            "Checkpoint saved"
        );
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Checkpoint cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MatchFetchError::persistence("removing checkpoint", e)),
        }
    }
}

/// In-memory checkpoint store.
///
/// Counts saves, and can be told to fail them to exercise persistence errors.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<Option<Checkpoint>>,
    saves: AtomicUsize,
    fail_saves: std::sync::atomic::AtomicBool,
    fail_after: Mutex<Option<usize>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a snapshot.
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            *state = Some(checkpoint);
        }
        store
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Make subsequent saves fail, or succeed again and lift any limit.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
        if !fail {
            if let Ok(mut limit) = self.fail_after.lock() {
                *limit = None;
            }
        }
    }

    /// Let `successes` more saves through, then fail every later one.
    pub fn fail_saves_after(&self, successes: usize) {
        if let Ok(mut limit) = self.fail_after.lock() {
            *limit = Some(self.save_count() + successes);
        }
    }

    /// Current snapshot, if any.
    pub fn snapshot(&self) -> Option<Checkpoint> {
        self.state.lock().ok().and_then(|s| s.clone())
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Option<Checkpoint> {
        let mut checkpoint = self.snapshot()?;
        checkpoint.normalize();
        Some(checkpoint)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let over_limit = self
            .fail_after
            .lock()
            .ok()
            .and_then(|limit| *limit)
            .is_some_and(|limit| self.save_count() >= limit);
        if over_limit || self.fail_saves.load(Ordering::Relaxed) {
            return Err(MatchFetchError::persistence(
                "writing checkpoint",
                std::io::Error::new(ErrorKind::StorageFull, "memory store refused write"),
            ));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| MatchFetchError::Internal("checkpoint store poisoned".to_string()))?;
        *state = Some(checkpoint.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MatchFetchError::Internal("checkpoint store poisoned".to_string()))?;
        *state = None;
        Ok(())
    }
}
