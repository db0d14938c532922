//! Persisted application settings.
//!
//! Stored as TOML in the config directory. Loading is deliberately lenient:
//! a missing file yields defaults, a corrupt file logs a warning and yields
//! defaults, and unknown or missing keys are filled from defaults. The app
//! must start regardless of what is on disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::paths::PromptbenchPaths;

/// Default server URL for a local Ollama install.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

/// UI color scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Dark,
    Light,
}

impl ThemePreference {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// User-tunable application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the generation server.
    pub server_url: String,
    /// Default sampling temperature for new requests.
    pub temperature: f32,
    /// Default cap on generated output tokens.
    pub max_output_units: u32,
    /// Persist completed runs to history automatically.
    pub auto_save_history: bool,
    /// Color scheme.
    pub theme: ThemePreference,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            temperature: 0.7,
            max_output_units: 32_768,
            auto_save_history: true,
            theme: ThemePreference::Dark,
        }
    }
}

/// Loads and saves [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(paths: &PromptbenchPaths) -> Self {
        Self {
            path: paths.settings_file(),
        }
    }

    /// Load settings, falling back to defaults for anything unreadable.
    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "corrupt settings file, using defaults");
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Persist settings to disk.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(settings)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Remove the settings file, restoring defaults on next load.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> SettingsStore {
        let paths = PromptbenchPaths::from_root(dir.path().to_path_buf());
        SettingsStore::new(&paths)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(store(&dir).load(), Settings::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let settings = Settings {
            server_url: "http://10.0.0.5:11434".to_string(),
            temperature: 1.2,
            theme: ThemePreference::Light,
            ..Settings::default()
        };
        store.save(&settings).unwrap();

        assert_eq!(store.load(), settings);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(dir.path().join("settings.toml"), "{{{not toml").unwrap();
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn partial_file_is_filled_from_defaults() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(dir.path().join("settings.toml"), "temperature = 1.5\n").unwrap();

        let loaded = store.load();
        assert_eq!(loaded.temperature, 1.5);
        assert_eq!(loaded.server_url, DEFAULT_SERVER_URL);
        assert!(loaded.auto_save_history);
    }

    #[test]
    fn reset_removes_the_file() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.save(&Settings::default()).unwrap();
        store.reset().unwrap();
        assert!(!dir.path().join("settings.toml").exists());
        // Resetting again is fine.
        store.reset().unwrap();
    }
}
