//! Conversation thread store
//!
//! One JSON file per thread under `threads/`. At most [`MAX_THREADS`]
//! threads are retained; creating past the cap evicts the
//! oldest-by-`updated` threads. `created` is immutable after first write,
//! `updated` changes only when the message list is saved.

use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::Paths;
use crate::remote::types::Message;

pub const MAX_THREADS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,

    /// Epoch milliseconds; set once at first write.
    pub created: i64,

    /// Epoch milliseconds; refreshed on each save.
    pub updated: i64,

    pub model: String,
    pub messages: Vec<Message>,
}

pub struct ThreadStore {
    dir: PathBuf,
}

impl ThreadStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            dir: paths.threads_dir(),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Allocate a new empty thread and prune past the retention cap.
    pub fn create(&self, model: &str) -> Result<String> {
        let id = Ulid::new().to_string();
        let now = Utc::now().timestamp_millis();

        let thread = Thread {
            id: id.clone(),
            created: now,
            updated: now,
            model: model.to_string(),
            messages: Vec::new(),
        };

        self.write(&thread)?;
        self.prune();
        Ok(id)
    }

    /// Parsed thread record, or `None` if absent or unparsable.
    pub fn get(&self, id: &str) -> Option<Thread> {
        let data = fs::read_to_string(self.path_for(id)).ok()?;
        match serde_json::from_str(&data) {
            Ok(thread) => Some(thread),
            Err(err) => {
                tracing::debug!(%id, %err, "thread file unparsable, treating as absent");
                None
            }
        }
    }

    /// Overwrite a thread's message list, preserving its original
    /// `created` timestamp when the record already exists.
    pub fn save(&self, id: &str, model: &str, messages: &[Message]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let created = self.get(id).map(|t| t.created).unwrap_or(now);

        let thread = Thread {
            id: id.to_string(),
            created,
            updated: now,
            model: model.to_string(),
            messages: messages.to_vec(),
        };

        self.write(&thread)
    }

    /// Id of the most recently updated thread, if any.
    pub fn latest(&self) -> Option<String> {
        self.list_all().into_iter().next().map(|t| t.id)
    }

    /// All parsed threads, descending by `updated`. Unparsable files are
    /// skipped.
    pub fn list_all(&self) -> Vec<Thread> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut threads: Vec<Thread> = entries
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let data = fs::read_to_string(e.path()).ok()?;
                serde_json::from_str(&data).ok()
            })
            .collect();

        threads.sort_by_key(|t| (Reverse(t.updated), Reverse(t.id.clone())));
        threads
    }

    /// Delete every thread file.
    pub fn clear_all(&self) -> Result<()> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Ok(());
        };

        for entry in entries.flatten() {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(entry.path())
                    .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
            }
        }
        Ok(())
    }

    fn write(&self, thread: &Thread) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let data = serde_json::to_string_pretty(thread)?;
        let path = self.path_for(&thread.id);
        fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(id = %thread.id, messages = thread.messages.len(), "thread saved");
        Ok(())
    }

    /// Drop oldest-by-`updated` threads beyond the cap.
    fn prune(&self) {
        let threads = self.list_all();
        for stale in threads.iter().skip(MAX_THREADS) {
            let _ = fs::remove_file(self.path_for(&stale.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> ThreadStore {
        ThreadStore::new(&Paths::at(dir))
    }

    #[test]
    fn create_then_get_returns_empty_thread() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let id = store.create("sonar").unwrap();
        let thread = store.get(&id).unwrap();

        assert_eq!(thread.id, id);
        assert_eq!(thread.model, "sonar");
        assert!(thread.messages.is_empty());
        assert_eq!(thread.created, thread.updated);
    }

    #[test]
    fn save_preserves_created_across_saves() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let id = store.create("sonar").unwrap();
        let created = store.get(&id).unwrap().created;

        sleep(Duration::from_millis(5));
        store
            .save(&id, "sonar", &[Message::user("q"), Message::assistant("a")])
            .unwrap();
        sleep(Duration::from_millis(5));
        store
            .save(
                &id,
                "sonar",
                &[
                    Message::user("q"),
                    Message::assistant("a"),
                    Message::user("q2"),
                ],
            )
            .unwrap();

        let thread = store.get(&id).unwrap();
        assert_eq!(thread.created, created);
        assert!(thread.updated > created);
        assert_eq!(thread.messages.len(), 3);
    }

    #[test]
    fn save_of_unknown_id_sets_created_now() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.save("fresh-id", "sonar", &[Message::user("q")]).unwrap();
        let thread = store.get("fresh-id").unwrap();
        assert_eq!(thread.created, thread.updated);
    }

    #[test]
    fn latest_tracks_most_recent_save() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let a = store.create("sonar").unwrap();
        sleep(Duration::from_millis(5));
        store
            .save(&a, "sonar", &[Message::user("q"), Message::assistant("a")])
            .unwrap();
        sleep(Duration::from_millis(5));

        let b = store.create("sonar").unwrap();
        sleep(Duration::from_millis(5));
        store.save(&b, "sonar", &[Message::user("q")]).unwrap();

        assert_eq!(store.latest().as_deref(), Some(b.as_str()));

        let all = store.list_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b);
        assert_eq!(all[1].id, a);
    }

    #[test]
    fn create_prunes_oldest_by_updated() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        // Seed threads with controlled timestamps so eviction order is
        // deterministic.
        fs::create_dir_all(dir.path().join("threads")).unwrap();
        for i in 0..MAX_THREADS {
            let thread = Thread {
                id: format!("seed-{i:03}"),
                created: 1_000 + i as i64,
                updated: 1_000 + i as i64,
                model: "sonar".into(),
                messages: Vec::new(),
            };
            fs::write(
                dir.path().join("threads").join(format!("{}.json", thread.id)),
                serde_json::to_string(&thread).unwrap(),
            )
            .unwrap();
        }

        let newest = store.create("sonar").unwrap();

        let all = store.list_all();
        assert_eq!(all.len(), MAX_THREADS);
        assert_eq!(all[0].id, newest);
        // seed-000 had the oldest `updated` and must be gone
        assert!(store.get("seed-000").is_none());
        assert!(store.get("seed-001").is_some());
    }

    #[test]
    fn missing_dir_and_corrupt_files_are_tolerated() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        assert_eq!(store.latest(), None);
        assert!(store.list_all().is_empty());
        store.clear_all().unwrap();

        let id = store.create("sonar").unwrap();
        fs::write(dir.path().join("threads").join("junk.json"), "{broken").unwrap();

        // Corrupt file is skipped, not fatal
        let all = store.list_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert!(store.get("junk").is_none());

        store.clear_all().unwrap();
        assert!(store.list_all().is_empty());
    }
}
