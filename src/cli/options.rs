//! Option resolution
//!
//! Merges per-invocation flags with stored defaults into one immutable
//! options record per command. Precedence per field: command-line flag >
//! stored default > hard-coded fallback > absent.
//!
//! Paired boolean flags (`--stream`/`--no-stream` and friends) resolve to
//! a tri-state first so an explicit negative flag is never overridden by
//! a stored default.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Defaults, Env, Settings};
use crate::remote::types::{ContextSize, Recency, ReasoningEffort, SearchMode};

use super::query::QueryArgs;
use super::search::SearchArgs;

/// Tri-state from a positive/negative flag pair: `None` when neither was
/// given.
pub fn tri(positive: bool, negative: bool) -> Option<bool> {
    match (positive, negative) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Resolved options for one `query` invocation.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub model: String,
    pub stream: bool,
    pub output: Option<PathBuf>,
    pub search_mode: Option<SearchMode>,
    pub recency: Option<Recency>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub images: bool,
    pub related: bool,
    pub reasoning: Option<ReasoningEffort>,
    pub context_size: Option<ContextSize>,
    pub language: Option<String>,
    pub system: Option<String>,
    pub json: bool,
    pub citations: bool,
    pub search: bool,
    pub safe_search: bool,
    pub raw: bool,
}

impl QueryOptions {
    pub fn resolve(args: &QueryArgs, settings: &Settings, env: &Env) -> Self {
        let defaults = settings.defaults.clone().unwrap_or_default();

        Self {
            model: settings.resolve_model(args.model.as_deref(), env),
            stream: args.stream_flag().or(defaults.stream).unwrap_or(true),
            output: args.output.clone(),
            search_mode: args.search_mode.or(defaults.search_mode),
            recency: args.recency,
            after: args.after.clone(),
            before: args.before.clone(),
            domains: args.domains.clone(),
            exclude_domains: args.exclude_domains.clone(),
            images: args.images,
            related: args.related,
            reasoning: args.reasoning,
            context_size: args.context_size.or(defaults.context_size),
            language: args.language.clone().or(defaults.language),
            system: args.system.clone(),
            json: args.json,
            citations: args.citations_flag().unwrap_or(true),
            search: args.search_flag().unwrap_or(true),
            safe_search: args.safe_search_flag().or(defaults.safe_search).unwrap_or(false),
            raw: args.raw,
        }
    }
}

/// Resolved options for one `search` invocation.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub mode: Option<SearchMode>,
    pub recency: Option<Recency>,
    pub domains: Vec<String>,
    pub json: bool,
}

impl SearchOptions {
    pub fn resolve(args: &SearchArgs, defaults: &Defaults) -> Self {
        Self {
            max_results: args.max_results,
            mode: args.mode.or(defaults.search_mode),
            recency: args.recency,
            domains: args.domains.clone(),
            json: args.json,
        }
    }
}

/// Resolved options for one `research start` invocation.
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub wait: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
}
