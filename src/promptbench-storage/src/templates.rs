//! Saved prompt templates.
//!
//! One JSON file per template under `templates/`. A file that fails to parse
//! is skipped with a warning when listing; it never breaks the picker.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::paths::PromptbenchPaths;

/// A reusable prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique template identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The prompt text itself.
    pub prompt: String,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
}

impl PromptTemplate {
    /// Create a new template with a generated ID.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            prompt: prompt.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

/// CRUD over stored prompt templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    paths: PromptbenchPaths,
}

impl TemplateStore {
    pub fn new(paths: PromptbenchPaths) -> Self {
        Self { paths }
    }

    /// List all templates, newest first.
    pub async fn list(&self) -> Result<Vec<PromptTemplate>> {
        let mut templates = Vec::new();

        if !self.paths.templates_dir.exists() {
            return Ok(templates);
        }

        let mut entries = fs::read_dir(&self.paths.templates_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match fs::read_to_string(&path).await {
                    Ok(raw) => match serde_json::from_str::<PromptTemplate>(&raw) {
                        Ok(template) => templates.push(template),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "skipping corrupt template")
                        }
                    },
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to read template"),
                }
            }
        }

        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    /// Save (create or overwrite) a template.
    pub async fn save(&self, template: &PromptTemplate) -> Result<()> {
        fs::create_dir_all(&self.paths.templates_dir).await?;
        let raw = serde_json::to_string_pretty(template)?;
        fs::write(self.paths.template_path(&template.id), raw).await?;
        Ok(())
    }

    /// Delete a template by ID. Deleting a missing template is a no-op.
    pub async fn delete(&self, template_id: &str) -> Result<()> {
        match fs::remove_file(self.paths.template_path(template_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> TemplateStore {
        TemplateStore::new(PromptbenchPaths::from_root(dir.path().to_path_buf()))
    }

    #[tokio::test]
    async fn template_crud() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let template = PromptTemplate::new("Quick question", "What is the capital of France?");
        let id = template.id.clone();
        store.save(&template).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], template);

        store.delete(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        // Deleting again is a no-op.
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_template_is_skipped() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        store
            .save(&PromptTemplate::new("Good", "still here"))
            .await
            .unwrap();
        std::fs::write(dir.path().join("templates/broken.json"), "not json").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Good");
    }

    #[tokio::test]
    async fn list_on_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        assert!(store.list().await.unwrap().is_empty());
    }
}
