// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine settings persisted as JSON next to the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Crossfade duration in milliseconds.
    pub fade_ms: u64,
    /// Startup volume, 0-100.
    pub volume_percent: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fade_ms: 2000,
            volume_percent: 80,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("cuedeck.json")
    }

    /// Load settings from file, or return defaults if the file doesn't exist
    pub fn load(dir: &Path) -> Result<Self, anyhow::Error> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            tracing::debug!("no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<(), anyhow::Error> {
        fs::create_dir_all(dir)?;

        let path = Self::settings_path(dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;

        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}
