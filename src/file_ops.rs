//! Atomic file operations.
//!
//! Every file this crate replaces (the configuration document, unit files,
//! launcher definitions) goes through [`write_file_atomic`], so a reader of
//! the destination path sees either the old or the new content and never a
//! missing or half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::NamedTempFile;

use crate::error::{LifecycleError, Result};

/// Write `content` to `path` through a temporary file in the same directory
/// followed by a rename.
///
/// The temporary file lives next to the destination so the rename never
/// crosses filesystems.
pub fn write_file_atomic(path: &Path, content: &str, mode: Option<u32>) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| LifecycleError::io("failed to create directory", dir, e))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| LifecycleError::io("failed to create temp file in", dir, e))?;

    temp.write_all(content.as_bytes())
        .map_err(|e| LifecycleError::io("failed to write temp file", temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| LifecycleError::io("failed to sync temp file", temp.path(), e))?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(mode))
            .map_err(|e| LifecycleError::io("failed to set permissions on", temp.path(), e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    temp.persist(path)
        .map_err(|e| LifecycleError::io("failed to rename temp file to", path, e.error))?;

    Ok(())
}

/// Timestamp suffix used for backups, e.g. `20261019-142501`.
pub fn backup_timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// `<path>.bak.<timestamp>`
pub fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".bak.{timestamp}"));
    path.with_file_name(name)
}

/// Copy `path` to a timestamped sibling and return the backup location.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let target = backup_path(path, &backup_timestamp());
    fs::copy(path, &target).map_err(|e| LifecycleError::io("failed to back up", path, e))?;
    log::info!("Backed up {} to {}", path.display(), target.display());
    Ok(target)
}

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LifecycleError::io("failed to read", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.service");
        write_file_atomic(&path, "one\n", None).unwrap();
        write_file_atomic(&path, "two\n", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");

        // no temp files left behind
        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_applies_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.desktop");
        write_file_atomic(&path, "[Desktop Entry]\n", Some(0o644)).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn backup_path_appends_suffix() {
        let p = backup_path(Path::new("/home/u/hindsight/hindsight.conf"), "20260101-000000");
        assert_eq!(
            p,
            PathBuf::from("/home/u/hindsight/hindsight.conf.bak.20260101-000000")
        );
    }

    #[test]
    fn read_optional_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_optional(&dir.path().join("absent")).unwrap().is_none());
    }
}
