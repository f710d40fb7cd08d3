//! CLI module - command definitions, dispatch context, argument
//! preprocessing.

use clap::{Parser, Subcommand};

pub mod config;
pub mod history;
pub mod models;
pub mod options;
pub mod query;
pub mod research;
pub mod search;
pub mod utils;

use crate::config::{Env, Paths, Settings};

/// plx - command-line client for the Perplexity AI API
#[derive(Parser, Debug)]
#[command(name = "plx")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show debug output on errors
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Override the stored API key
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a query to the Perplexity API
    Query(query::QueryArgs),

    /// Search the web via the Search API
    Search(search::SearchArgs),

    /// Deep research using sonar-deep-research (async)
    Research(research::ResearchArgs),

    /// View history of recent queries
    History(history::HistoryArgs),

    /// List available models
    Models(models::ModelsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Set the API key (alias for `config set-key`)
    SetKey {
        /// The API key
        key: String,
    },

    /// View the API key, masked (alias for `config view-key`)
    ViewKey,

    /// Remove the stored API key (alias for `config clear-key`)
    ClearKey,
}

/// Process-scoped context passed to every command executor.
///
/// Built once in main; replaces hidden module-level singletons for the
/// environment snapshot, path resolution, and loaded settings.
pub struct Context {
    pub env: Env,
    pub paths: Paths,
    pub settings: Settings,
    pub api_key: Option<String>,
    pub verbose: bool,
}

const KNOWN_COMMANDS: &[&str] = &[
    "query",
    "search",
    "research",
    "history",
    "models",
    "config",
    "set-key",
    "view-key",
    "clear-key",
    "help",
];

const RESEARCH_SUBCOMMANDS: &[&str] = &["start", "status", "get", "help"];

/// Argument preprocessing ahead of clap.
///
/// Two conveniences, both pure argv rewrites:
/// - `plx "question"` becomes `plx query "question"` when the first
///   argument is not a known command
/// - `plx research "topic"` becomes `plx research start "topic"`
pub fn preprocess_args(mut args: Vec<String>) -> Vec<String> {
    let Some(first) = args.get(1).cloned() else {
        return args;
    };

    if !first.starts_with('-') && !KNOWN_COMMANDS.contains(&first.as_str()) {
        args.insert(1, "query".to_string());
        return args;
    }

    if first == "research" {
        if let Some(second) = args.get(2) {
            if !second.starts_with('-') && !RESEARCH_SUBCOMMANDS.contains(&second.as_str()) {
                args.insert(2, "start".to_string());
            }
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_question_becomes_a_query() {
        let args = preprocess_args(argv(&["plx", "What is Rust?", "--no-stream"]));
        assert_eq!(args, argv(&["plx", "query", "What is Rust?", "--no-stream"]));
    }

    #[test]
    fn known_commands_are_untouched() {
        for cmd in ["query", "models", "config", "set-key", "help"] {
            let args = preprocess_args(argv(&["plx", cmd]));
            assert_eq!(args, argv(&["plx", cmd]));
        }

        let args = preprocess_args(argv(&["plx", "--verbose"]));
        assert_eq!(args, argv(&["plx", "--verbose"]));
    }

    #[test]
    fn research_topic_becomes_research_start() {
        let args = preprocess_args(argv(&["plx", "research", "quantum computing"]));
        assert_eq!(args, argv(&["plx", "research", "start", "quantum computing"]));

        let args = preprocess_args(argv(&["plx", "research", "status", "job-1"]));
        assert_eq!(args, argv(&["plx", "research", "status", "job-1"]));
    }

    #[test]
    fn empty_invocation_passes_through() {
        let args = preprocess_args(argv(&["plx"]));
        assert_eq!(args, argv(&["plx"]));
    }
}
