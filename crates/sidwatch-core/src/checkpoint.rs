//! The last persisted fingerprint.
//!
//! The slot holds exactly the fingerprint text. A missing slot reads as the
//! sentinel, and the sentinel is never written.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::io::{atomic_write, remove_if_exists};

pub trait CheckpointStore {
    /// The persisted fingerprint, or the sentinel when nothing is stored.
    fn read(&self) -> Result<Fingerprint>;

    /// Persist `fp`. Returns `Ok(false)` without touching the slot when `fp`
    /// is the sentinel.
    fn write(&self, fp: &Fingerprint) -> Result<bool>;

    /// Remove the slot if present.
    fn clear(&self) -> Result<()>;
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for &T {
    fn read(&self) -> Result<Fingerprint> {
        (**self).read()
    }

    fn write(&self, fp: &Fingerprint) -> Result<bool> {
        (**self).write(fp)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// A checkpoint kept in a single text file, replaced by write-then-rename.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpoint {
    fn read(&self) -> Result<Fingerprint> {
        if !self.path.exists() {
            return Ok(Fingerprint::sentinel());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let line = data.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(Fingerprint::sentinel());
        }
        Ok(Fingerprint::from(line))
    }

    fn write(&self, fp: &Fingerprint) -> Result<bool> {
        if fp.is_sentinel() {
            debug!(path = %self.path.display(), "refusing to persist sentinel fingerprint");
            return Ok(false);
        }
        atomic_write(&self.path, fp.as_str().as_bytes())?;
        info!(path = %self.path.display(), fingerprint = %fp, "checkpoint saved");
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        if remove_if_exists(&self.path)? {
            info!(path = %self.path.display(), "checkpoint cleared");
        }
        Ok(())
    }
}
