use crate::{GAMES_MARKER, PROJECT_MARKER, is_games_directory};
use smashstats_core::error::StorageError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Folder the game client writes replays into, under Documents.
pub const REPLAY_FOLDER: &str = "Slippi";

/// `<Documents>/Slippi` if present, else `<Documents>`.
pub fn default_replay_directory() -> Option<PathBuf> {
    let documents = dirs::document_dir().filter(|path| path.is_dir())?;
    let replays = documents.join(REPLAY_FOLDER);
    Some(if replays.is_dir() { replays } else { documents })
}

/// Returns `configured` if it exists, else the default replay directory.
pub fn resolve_replay_directory(configured: Option<&Path>) -> Option<PathBuf> {
    match configured {
        Some(path) if path.is_dir() => Some(path.to_path_buf()),
        _ => default_replay_directory(),
    }
}

/// Creates `<base>/SmashStats/Games` if needed.
pub async fn ensure_games_directory(base: &Path) -> Result<PathBuf, StorageError> {
    let games = base.join(PROJECT_MARKER).join(GAMES_MARKER);
    if !games.is_dir() {
        info!("Creating games directory {}", games.display());
        fs::create_dir_all(&games).await?;
    }
    Ok(games)
}

/// Keeps a valid configured games directory, otherwise falls back to
/// `<Documents>/SmashStats/Games`.
pub async fn resolve_games_directory(configured: Option<&Path>) -> Result<PathBuf, StorageError> {
    if let Some(path) = configured
        && is_games_directory(path)
    {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = configured {
        warn!("Configured games directory {} is not valid", path.display());
    }

    let documents = dirs::document_dir()
        .filter(|path| path.is_dir())
        .ok_or_else(|| StorageError::InvalidDirectory("no documents directory".into()))?;
    let games = ensure_games_directory(&documents).await?;
    if is_games_directory(&games) {
        Ok(games)
    } else {
        Err(StorageError::InvalidDirectory(
            games.to_string_lossy().to_string(),
        ))
    }
}
