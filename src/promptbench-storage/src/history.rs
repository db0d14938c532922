//! Run history.
//!
//! Completed generations append to a single JSONL file, one record per line.
//! Appends are cheap, listing reads the whole file newest-first, and corrupt
//! lines are skipped with a warning.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::paths::PromptbenchPaths;

/// One finished generation: the request, the final text, and final metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique record identifier.
    pub id: String,
    /// Model that generated the response.
    pub model: String,
    /// Prompt text that was sent.
    pub prompt: String,
    /// Sampling temperature used.
    pub temperature: f32,
    /// Final response text.
    pub response: String,
    /// Total generation time in milliseconds.
    pub elapsed_ms: u64,
    /// Streamed fragments that carried text.
    pub unit_count: u64,
    /// Units per second, when computable.
    #[serde(default)]
    pub rate_per_second: Option<f64>,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
}

impl SessionRecord {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        temperature: f32,
        response: impl Into<String>,
        elapsed_ms: u64,
        unit_count: u64,
        rate_per_second: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            response: response.into(),
            elapsed_ms,
            unit_count,
            rate_per_second,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Append-only store of [`SessionRecord`]s.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    paths: PromptbenchPaths,
}

impl HistoryStore {
    pub fn new(paths: PromptbenchPaths) -> Self {
        Self { paths }
    }

    /// Append one record.
    pub async fn append(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.paths.history_dir).await?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.history_file())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// List all records, newest first.
    pub async fn list(&self) -> Result<Vec<SessionRecord>> {
        let path = self.paths.history_file();
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records: Vec<SessionRecord> = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "skipping corrupt history line"),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete all history.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(self.paths.history_file()).await {
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

    fn store(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(PromptbenchPaths::from_root(dir.path().to_path_buf()))
    }

    fn record(response: &str) -> SessionRecord {
        SessionRecord::new(
            "llama3.2",
            "a prompt",
            0.7,
            response,
            1500,
            12,
            Some(8.0),
        )
    }

    #[tokio::test]
    async fn append_and_list_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let first = record("first response");
        let second = record("second response");
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|r| r.id == first.id));
        assert!(listed.iter().any(|r| r.id == second.id));
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        store.append(&record("kept")).await.unwrap();
        let path = dir.path().join("history/records.jsonl");
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("{this is not json}\n");
        std::fs::write(&path, raw).unwrap();
        store.append(&record("also kept")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        store.append(&record("gone soon")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        // Clearing an empty store is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_lists_empty() {
        let dir = tempdir().unwrap();
        assert!(store(&dir).list().await.unwrap().is_empty());
    }
}
