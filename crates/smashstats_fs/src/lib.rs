//! # SmashStats FileSystem Storage
//!
//! A local filesystem backend for converted replay records.
//!
//! This crate implements the [`RecordStorage`] trait: one JSON file per
//! converted replay inside the games directory, plus the `metadata.json` and
//! `keys.json` sidecars one directory above it.
//!
//! ## Features
//!
//! * **Atomic Writes**: Uses temporary files and rename operations so a record or sidecar is never read half-written.
//! * **Directory Guard**: Refuses to write unless the games directory looks like `.../SmashStats/.../Games` and exists.
//!
//! ## Usage
//!
//! ```no_run
//! use smashstats_fs::FileSystemStorage;
//!
//! let storage = FileSystemStorage::new("/home/me/Documents/SmashStats/Games");
//! ```

mod locate;
mod parser;

pub use locate::*;
pub use parser::ReplayDumpParser;

use bytes::Bytes;
use smashstats_core::prelude::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

pub const PROJECT_MARKER: &str = "SmashStats";
pub const GAMES_MARKER: &str = "Games";
pub const RECORD_EXTENSION: &str = "json";

async fn atomic_write(path: &Path, data: Bytes) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
    }

    let tmp_path = path.with_extension("tmp");

    fs::write(&tmp_path, data).await.map_err(StorageError::Io)?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(StorageError::Io)?;

    Ok(())
}

async fn read(path: &Path) -> Result<Bytes, StorageError> {
    match fs::read(path).await {
        Ok(data) => Ok(Bytes::from(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StorageError::NotFound(path.to_string_lossy().to_string()))
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Whether `path` names the project's games folder and exists.
pub fn is_games_directory(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.contains(PROJECT_MARKER) && text.contains(GAMES_MARKER) && path.is_dir()
}

#[derive(Clone, Debug)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.{RECORD_EXTENSION}"))
    }

    /// Sidecars live one level above the games directory.
    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.root.parent().unwrap_or(&self.root).join(name)
    }

    fn guard(&self) -> Result<(), StorageError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(StorageError::InvalidDirectory(
                self.root.to_string_lossy().to_string(),
            ))
        }
    }
}

impl RecordStorage for FileSystemStorage {
    fn is_valid(&self) -> bool {
        is_games_directory(&self.root)
    }

    #[instrument(skip(self, data), fields(root = %self.root.display()))]
    async fn write_record(&self, stem: &str, data: Bytes) -> Result<(), StorageError> {
        self.guard()?;
        atomic_write(&self.record_path(stem), data).await?;
        debug!("Wrote record");
        Ok(())
    }

    async fn read_record(&self, stem: &str) -> Result<Bytes, StorageError> {
        read(&self.record_path(stem)).await
    }

    /// Zero-byte files are skipped so an interrupted write counts as
    /// unprocessed on the next scan.
    async fn list_records(&self) -> Result<Vec<String>, StorageError> {
        self.guard()?;
        let mut stems = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_record = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION));
            if !is_record || entry.metadata().await?.len() == 0 {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                stems.push(stem.to_string());
            }
        }
        Ok(stems)
    }

    async fn read_sidecar(&self, name: &str) -> Result<Bytes, StorageError> {
        read(&self.sidecar_path(name)).await
    }

    async fn write_sidecar(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        self.guard()?;
        atomic_write(&self.sidecar_path(name), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_requires_both_markers() {
        let tmp = tempfile::tempdir().unwrap();
        let games = tmp.path().join("SmashStats").join("Games");
        std::fs::create_dir_all(&games).unwrap();
        assert!(is_games_directory(&games));
        assert!(!is_games_directory(&tmp.path().join("SmashStats")));

        let other = tmp.path().join("Games");
        std::fs::create_dir_all(&other).unwrap();
        assert!(!is_games_directory(&other));

        assert!(!is_games_directory(&tmp.path().join("SmashStats").join("Games2").join("x")));
    }

    #[test]
    fn sidecars_sit_above_the_games_dir() {
        let storage = FileSystemStorage::new("/data/SmashStats/Games");
        assert_eq!(
            storage.sidecar_path(METADATA_FILE),
            PathBuf::from("/data/SmashStats/metadata.json")
        );
        assert_eq!(
            storage.record_path("Game_1"),
            PathBuf::from("/data/SmashStats/Games/Game_1.json")
        );
    }
}
