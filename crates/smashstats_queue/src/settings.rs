use serde::{Deserialize, Serialize};
use smashstats_core::prelude::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const APP_FOLDER: &str = "smashstats";
const SETTINGS_FILE: &str = "settings.json";

/// Persisted user settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Settings {
    pub slp_directory: Option<PathBuf>,
    pub game_directory: Option<PathBuf>,
    pub code_keys: CodeKeys,
    pub selected_player_code: String,
}

impl Settings {
    /// `<config dir>/smashstats/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_FOLDER).join(SETTINGS_FILE))
    }

    /// Missing or malformed settings load as defaults.
    pub async fn load(path: &Path) -> Self {
        match fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!("Settings at {} are malformed: {e}", path.display());
                Self::default()
            }),
            Err(e) => {
                debug!("No settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).await?;
        Ok(())
    }

    /// The selected code, if one is set.
    pub fn selected_code(&self) -> Option<&str> {
        Some(self.selected_player_code.as_str()).filter(|code| !code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_the_store_key_names() {
        let settings = Settings {
            slp_directory: Some("/replays".into()),
            selected_player_code: "ABC#123".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["SLP_DIRECTORY"], "/replays");
        assert_eq!(value["SELECTED_PLAYER_CODE"], "ABC#123");
        assert!(value["CODE_KEYS"].is_object());
        assert!(value["GAME_DIRECTORY"].is_null());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"GAME_DIRECTORY": "/data/SmashStats/Games"}"#).unwrap();
        assert_eq!(settings.selected_code(), None);
        assert_eq!(
            settings.game_directory.as_deref(),
            Some(Path::new("/data/SmashStats/Games"))
        );
    }

    #[tokio::test]
    async fn saves_and_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(SETTINGS_FILE);
        assert_eq!(Settings::load(&path).await, Settings::default());

        let mut settings = Settings::default();
        settings.selected_player_code = "ABC#123".into();
        settings
            .code_keys
            .insert("ABC#123".into(), UploadCredential::new("k", "abcd1234"));
        settings.save(&path).await.unwrap();
        assert_eq!(Settings::load(&path).await, settings);
    }
}
