//! OS-aware path detection for Promptbench storage.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, StorageError};

/// Application name used for storage directories.
pub const APP_NAME: &str = "Promptbench";

/// Subdirectory and file names.
pub const TEMPLATES_DIR: &str = "templates";
pub const HISTORY_DIR: &str = "history";
pub const LOGS_DIR: &str = "logs";
pub const HISTORY_FILE: &str = "records.jsonl";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Promptbench storage paths container.
#[derive(Debug, Clone)]
pub struct PromptbenchPaths {
    /// Root data directory (platform-specific).
    pub data_dir: PathBuf,
    /// Config directory holding the settings file.
    pub config_dir: PathBuf,
    /// Prompt templates directory.
    pub templates_dir: PathBuf,
    /// Run history directory.
    pub history_dir: PathBuf,
    /// Logs directory.
    pub logs_dir: PathBuf,
}

impl PromptbenchPaths {
    /// Create paths with automatic OS detection.
    pub fn new() -> Result<Self> {
        let data_dir = promptbench_data_dir()?;
        let config_dir = promptbench_config_dir()?;
        Ok(Self::from_dirs(data_dir, config_dir))
    }

    /// Create paths rooted at a single custom directory. Used by tests and by
    /// the `--data-dir` override, where keeping config next to data is the
    /// point.
    pub fn from_root(root: PathBuf) -> Self {
        Self::from_dirs(root.clone(), root)
    }

    fn from_dirs(data_dir: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            templates_dir: data_dir.join(TEMPLATES_DIR),
            history_dir: data_dir.join(HISTORY_DIR),
            logs_dir: data_dir.join(LOGS_DIR),
            data_dir,
            config_dir,
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.templates_dir)?;
        std::fs::create_dir_all(&self.history_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        debug!(data_dir = %self.data_dir.display(), "storage directories initialized");
        Ok(())
    }

    /// Path of the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Path of a template file.
    pub fn template_path(&self, template_id: &str) -> PathBuf {
        self.templates_dir.join(format!("{template_id}.json"))
    }

    /// Path of the run history file.
    pub fn history_file(&self) -> PathBuf {
        self.history_dir.join(HISTORY_FILE)
    }
}

/// Get the Promptbench data directory based on the current OS.
pub fn promptbench_data_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("PROMPTBENCH_DATA_DIR")
        && !val.is_empty()
    {
        let path = PathBuf::from(val);
        debug!(path = %path.display(), "using PROMPTBENCH_DATA_DIR override");
        return Ok(path);
    }

    let base = dirs::data_dir().ok_or(StorageError::HomeDirNotFound)?;
    Ok(base.join(APP_NAME))
}

/// Get the Promptbench config directory based on the current OS.
pub fn promptbench_config_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("PROMPTBENCH_CONFIG_DIR")
        && !val.is_empty()
    {
        let path = PathBuf::from(val);
        debug!(path = %path.display(), "using PROMPTBENCH_CONFIG_DIR override");
        return Ok(path);
    }

    let base = dirs::config_dir().ok_or(StorageError::HomeDirNotFound)?;
    Ok(base.join(APP_NAME))
}
