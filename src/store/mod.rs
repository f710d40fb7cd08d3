//! Local persistence: query history and conversation threads.
//!
//! Flat JSON files under the config directory. Single-writer-at-a-time is
//! assumed; concurrent CLI invocations can interleave writes with
//! last-writer-wins results. No file locking (accepted for a single-user
//! local tool). Unreadable or corrupt files read as empty.

pub mod history;
pub mod threads;

pub use history::{HistoryEntry, HistoryStore};
pub use threads::{Thread, ThreadStore};
