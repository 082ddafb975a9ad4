//! Backup store
//!
//! Timestamped, immutable pre-modification snapshots. A backup is written
//! before any destructive write for its file and is never overwritten:
//! creation uses `create_new`, and a same-second collision retries with a
//! counter suffix. One file accumulates as many backups as it has
//! modifications in a session.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout used in backup filenames.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes timestamped copies of pre-modification text.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// Create a store rooted at a directory.
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backup directory.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a timestamped backup of `original` for `source_path`.
    ///
    /// Returns the backup's path. Fails if the directory cannot be
    /// created or the copy cannot be written; never overwrites an
    /// existing backup.
    pub fn backup(&self, source_path: &Path, original: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        let mut attempt = 0u32;
        loop {
            let backup_name = if attempt == 0 {
                format!("{file_name}.{timestamp}.bak")
            } else {
                format!("{file_name}.{timestamp}-{attempt}.bak")
            };
            let backup_path = self.dir.join(backup_name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&backup_path)
            {
                Ok(mut file) => {
                    file.write_all(original.as_bytes())?;
                    tracing::info!(
                        source = %source_path.display(),
                        backup = %backup_path.display(),
                        "created backup"
                    );
                    return Ok(backup_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Backups present for a source file name, unordered.
    pub fn backups_for(&self, file_name: &str) -> std::io::Result<Vec<PathBuf>> {
        let prefix = format!("{file_name}.");
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".bak") {
                found.push(entry.path());
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_writes_original_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let path = store
            .backup(Path::new("scripts/PlayerController.rs"), "original body")
            .unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("PlayerController.rs."));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "original body");
    }

    #[test]
    fn same_second_backups_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        let source = Path::new("A.rs");

        let first = store.backup(source, "one").unwrap();
        let second = store.backup(source, "two").unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(first).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "two");
    }

    #[test]
    fn backups_accumulate_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        let source = Path::new("A.rs");

        store.backup(source, "one").unwrap();
        store.backup(source, "two").unwrap();
        store.backup(Path::new("B.rs"), "other").unwrap();

        assert_eq!(store.backups_for("A.rs").unwrap().len(), 2);
        assert_eq!(store.backups_for("B.rs").unwrap().len(), 1);
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("nested/backups"));

        store.backup(Path::new("A.rs"), "text").unwrap();
        assert!(store.dir().is_dir());
    }
}
