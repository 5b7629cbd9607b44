use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::models::preferences::Theme;

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Default, Deserialize, Serialize)]
struct StoredPreferences {
    theme: Option<Theme>,
}

/// Client-side preferences kept in a small JSON file.
#[derive(Clone, Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `dir` if given, otherwise the platform config directory.
    pub fn locate(dir: Option<&Path>) -> Option<Self> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => ProjectDirs::from("org", "EcoPoints", "ecopoints")?
                .config_dir()
                .to_path_buf(),
        };
        Some(Self::new(dir.join(PREFERENCES_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoredPreferences {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable preferences at {:?}: {}", self.path, e);
                StoredPreferences::default()
            }),
            Err(_) => StoredPreferences::default(),
        }
    }

    pub fn theme(&self) -> Option<Theme> {
        self.read().theme
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), anyhow::Error> {
        let mut stored = self.read();
        stored.theme = Some(theme);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;

        Ok(())
    }
}
