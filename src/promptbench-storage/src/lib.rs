//! Promptbench storage - settings, prompt templates and run history.
//!
//! Everything lives under an OS-appropriate data directory:
//!
//! - **Windows**: `%APPDATA%\Promptbench\`
//! - **macOS**: `~/Library/Application Support/Promptbench/`
//! - **Linux**: `~/.local/share/Promptbench/`
//!
//! Each namespace (settings, templates, history) serializes independently and
//! tolerates missing or corrupt files by falling back to defaults: a broken
//! settings file never stops the app from starting, and a mangled history
//! line is skipped, not fatal.

pub mod error;
pub mod history;
pub mod paths;
pub mod settings;
pub mod templates;

pub use error::{Result, StorageError};
pub use history::{HistoryStore, SessionRecord};
pub use paths::{PromptbenchPaths, promptbench_config_dir, promptbench_data_dir};
pub use settings::{Settings, SettingsStore, ThemePreference};
pub use templates::{PromptTemplate, TemplateStore};
