//! Query history store
//!
//! A single `history.json` holding the most recent queries, newest first,
//! capped at [`MAX_HISTORY`] entries. Older entries are silently dropped
//! on write; there is no archival.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::Paths;

pub const MAX_HISTORY: usize = 100;
pub const PREVIEW_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub question: String,
    pub model: String,

    /// Epoch milliseconds.
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<usize>,
}

pub struct HistoryStore {
    file: PathBuf,
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            file: paths.history_file(),
            dir: paths.config_dir().to_path_buf(),
        }
    }

    /// Stored entries, newest first. Missing or corrupt file reads as
    /// empty.
    pub fn list(&self) -> Vec<HistoryEntry> {
        match fs::read_to_string(&self.file) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                tracing::debug!(%err, "history.json unparsable, treating as empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Prepend a new entry and persist, truncated to the cap.
    pub fn append(
        &self,
        question: &str,
        model: &str,
        response: Option<&str>,
        citations: Option<usize>,
    ) -> Result<()> {
        let mut entries = self.list();

        entries.insert(
            0,
            HistoryEntry {
                id: Ulid::new().to_string(),
                question: question.to_string(),
                model: model.to_string(),
                timestamp: Utc::now().timestamp_millis(),
                response_preview: response.map(|r| r.chars().take(PREVIEW_LENGTH).collect()),
                citations,
            },
        );
        entries.truncate(MAX_HISTORY);

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let data = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.file, data)
            .with_context(|| format!("Failed to write {}", self.file.display()))?;
        tracing::debug!(count = entries.len(), "history saved");
        Ok(())
    }

    /// Delete the backing file; a subsequent `list` returns empty.
    pub fn clear(&self) -> Result<()> {
        if self.file.exists() {
            fs::remove_file(&self.file)
                .with_context(|| format!("Failed to remove {}", self.file.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> HistoryStore {
        HistoryStore::new(&Paths::at(dir))
    }

    #[test]
    fn appended_entries_list_newest_first() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.append("first", "sonar", None, None).unwrap();
        store.append("second", "sonar", Some("answer"), Some(3)).unwrap();

        let entries = store.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question, "second");
        assert_eq!(entries[0].citations, Some(3));
        assert_eq!(entries[1].question, "first");
    }

    #[test]
    fn history_is_capped_at_max_entries() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        for i in 0..MAX_HISTORY + 5 {
            store.append(&format!("q{i}"), "sonar", None, None).unwrap();
        }

        let entries = store.list();
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0].question, format!("q{}", MAX_HISTORY + 4));
        assert_eq!(entries.last().unwrap().question, "q5");
    }

    #[test]
    fn response_preview_is_truncated() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let long = "x".repeat(PREVIEW_LENGTH * 2);
        store.append("q", "sonar", Some(&long), None).unwrap();

        let preview = store.list()[0].response_preview.clone().unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_LENGTH);
    }

    #[test]
    fn clear_then_list_is_empty() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.append("q", "sonar", None, None).unwrap();
        store.clear().unwrap();
        assert!(store.list().is_empty());

        // Clearing an already-absent file is fine
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        fs::write(dir.path().join("history.json"), "[{broken").unwrap();
        assert!(store.list().is_empty());
    }
}
