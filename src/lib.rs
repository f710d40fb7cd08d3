//! plx - Command-line client for the Perplexity AI API
//!
//! Queries, web search, and long-running deep-research jobs against the
//! hosted API, with local JSON-backed configuration, query history, and
//! conversation threads.
//!
//! ## Key concepts
//!
//! - **Settings**: `config.json` holding the API key and named defaults,
//!   resolved with flag > environment > stored > fallback precedence
//! - **Threads**: one JSON file per conversation for multi-turn continuation
//! - **Deep research**: async submit/poll/fetch flow for long jobs

pub mod cli;
pub mod config;
pub mod output;
pub mod remote;
pub mod store;

pub use config::{Env, Paths, Settings};
pub use remote::{ApiError, Client};
pub use store::{HistoryStore, ThreadStore};
