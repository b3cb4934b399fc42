//! JSON persistence for the per-host state map.
//!
//! Load degrades missing or corrupt files to an empty map; monitoring
//! must start from fresh defaults rather than abort. Save writes a
//! temporary file and renames it so readers always see a complete file,
//! and runs unconditionally at the end of every run.
//!
//! A lock file serializes runs against the same state file: concurrent
//! runs would silently lose latency samples and rate-limiter counts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::state::HostState;

/// Mapping of host identifier to persisted state.
pub type StateMap = BTreeMap<String, HostState>;

/// Handle on the state file, holding the run lock for its lifetime.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateStore {
    /// Open the store at `path`, acquiring the single-flight run lock.
    ///
    /// # Errors
    ///
    /// Returns an error when the parent directory cannot be created or
    /// another run already holds the lock.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create state directory {}", parent.display())
                })?;
            }
        }

        let lock_path = path.with_extension("lock");
        let lock = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path);
        match lock {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                anyhow::bail!(
                    "another run holds the state lock {} (remove it if stale)",
                    lock_path.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to create state lock {}", lock_path.display())
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock_path,
        })
    }

    /// Path of the underlying state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state map.
    ///
    /// Missing or corrupt data yields an empty map, never an error.
    pub fn load(&self) -> StateMap {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no state file, starting fresh");
                return StateMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, starting fresh");
                return StateMap::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file corrupt, starting fresh");
                StateMap::new()
            }
        }
    }

    /// Persist the state map atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or file operations fail.
    pub fn save(&self, states: &StateMap) -> Result<()> {
        let json =
            serde_json::to_string_pretty(states).context("failed to serialize state map")?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json.as_bytes())
            .with_context(|| format!("failed to write state temp file {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename state file {}", self.path.display()))?;

        info!(path = %self.path.display(), hosts = states.len(), "state saved");
        Ok(())
    }
}

impl Drop for StateStore {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            warn!(path = %self.lock_path.display(), error = %e, "failed to remove state lock");
        }
    }
}
