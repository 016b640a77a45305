use crate::error::{Result, WatchError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
///
/// The tempfile is fsynced before the rename, so a reader sees either the
/// previous content or the complete new content.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create `path` holding `data` only if nothing exists there yet. The content
/// is written to a tempfile first, so the file never appears half-written.
/// Returns `false` if `path` already exists.
pub fn create_exclusive(path: &Path, data: &[u8]) -> Result<bool> {
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}

/// Create the parent directory of `path` and all of its ancestors, idempotent.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Remove a file. Returns `false` if there was nothing to remove.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Open `path` for appending, creating it and its parent directory if needed.
pub fn open_append(path: &Path) -> Result<std::fs::File> {
    ensure_parent(path)?;
    let f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(f)
}

/// Resolve a configured path: `~/` expands to the home directory, relative
/// paths are joined onto `base`, absolute paths pass through.
pub fn resolve_path(base: &Path, raw: &Path) -> Result<PathBuf> {
    if let Ok(rest) = raw.strip_prefix("~") {
        let home = home::home_dir().ok_or(WatchError::HomeNotFound)?;
        return Ok(home.join(rest));
    }
    if raw.is_absolute() {
        return Ok(raw.to_path_buf());
    }
    Ok(base.join(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.chk");
        atomic_write(&path, b"12,34").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "12,34");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/state.chk");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_replaces_longer_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.chk");
        atomic_write(&path, b"1234567890,1234567890").unwrap();
        atomic_write(&path, b"1,2").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2");
    }

    #[test]
    fn create_exclusive_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run/sidwatch.pid");
        assert!(create_exclusive(&path, b"first").unwrap());
        assert!(!create_exclusive(&path, b"second").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn remove_if_exists_reports_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.chk");
        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, "x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn open_append_keeps_existing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log/restart.log");
        {
            let mut f = open_append(&path).unwrap();
            writeln!(f, "first").unwrap();
        }
        {
            let mut f = open_append(&path).unwrap();
            writeln!(f, "second").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn resolve_path_joins_relative_onto_base() {
        let base = Path::new("/etc/sidwatch");
        assert_eq!(
            resolve_path(base, Path::new("tmp/sidwatch.chk")).unwrap(),
            PathBuf::from("/etc/sidwatch/tmp/sidwatch.chk")
        );
        assert_eq!(
            resolve_path(base, Path::new("/var/run/sidwatch.pid")).unwrap(),
            PathBuf::from("/var/run/sidwatch.pid")
        );
    }
}
