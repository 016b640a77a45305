use crate::error::{Result, WatchError};
use crate::io::{atomic_write, create_exclusive, remove_if_exists};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// ---------------------------------------------------------------------------
// InstanceRecord
// ---------------------------------------------------------------------------

/// Who holds the watchdog's pid file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub pid: u32,
    pub config: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl InstanceRecord {
    pub fn current(config: &Path) -> Self {
        Self {
            pid: std::process::id(),
            config: config.to_path_buf(),
            started_at: Utc::now(),
        }
    }

    /// Read the record at `path`. A missing or unreadable file is `None`.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data).ok())
    }

    /// Atomically write this record to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(path, data.as_bytes())
    }

    /// Claim `path` for this process. The record is created exclusively, so
    /// of several concurrent claimants exactly one succeeds. Fails with
    /// `AlreadyRunning` if a live process holds it; a stale or unreadable
    /// record is removed and the claim retried once.
    pub fn acquire(path: &Path, config: &Path) -> Result<Self> {
        let record = Self::current(config);
        let data = serde_yaml::to_string(&record)?;

        for attempt in 0..2 {
            if create_exclusive(path, data.as_bytes())? {
                return Ok(record);
            }
            match Self::read(path)? {
                Some(existing) if is_pid_alive(existing.pid) => {
                    return Err(WatchError::AlreadyRunning(existing.pid));
                }
                _ if attempt == 0 => {
                    debug!(path = %path.display(), "replacing stale instance record");
                    remove_if_exists(path)?;
                }
                _ => {}
            }
        }

        // lost the retry to another claimant
        match Self::read(path)? {
            Some(existing) => Err(WatchError::AlreadyRunning(existing.pid)),
            None => Err(WatchError::Io(std::io::Error::other(format!(
                "could not claim {}",
                path.display()
            )))),
        }
    }

    /// Remove the record at `path` if it still names this record's pid.
    pub fn release(&self, path: &Path) -> Result<()> {
        match Self::read(path)? {
            Some(existing) if existing.pid == self.pid => {
                remove_if_exists(path)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// The live instance recorded at `path`, pruning a stale record.
pub fn running(path: &Path) -> Result<Option<InstanceRecord>> {
    match InstanceRecord::read(path)? {
        Some(record) if is_pid_alive(record.pid) => Ok(Some(record)),
        Some(_) => {
            remove_if_exists(path)?;
            Ok(None)
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// PID helpers (Unix only)
// ---------------------------------------------------------------------------

/// Returns true if the process is still alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Send SIGTERM to a process (`kill -TERM {pid}`).
pub fn terminate(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()?;
        if !status.success() {
            return Err(WatchError::Io(std::io::Error::other(format!(
                "kill -TERM {pid} failed with exit code {:?}",
                status.code()
            ))));
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(WatchError::Io(std::io::Error::other(
            "terminate is not supported on this platform",
        )))
    }
}
