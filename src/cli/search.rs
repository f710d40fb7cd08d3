//! `plx search` command
//!
//! Web search rendered as a ranked result list rather than a prose
//! answer.
//!
//! # Usage
//! ```bash
//! plx search "rust async runtimes"
//! plx search "earnings report" --mode sec --recency month
//! plx search "query" --domain arxiv.org --json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::remote::types::{ChatRequest, Message, Recency, SearchMode};
use crate::remote::Client;

use super::options::SearchOptions;
use super::utils::require_api_key;
use super::Context;

const SEARCH_SYSTEM_PROMPT: &str = "Provide concise search results with sources.";
const SNIPPET_LENGTH: usize = 150;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results
    #[arg(long, default_value_t = 10, value_name = "N")]
    pub max_results: usize,

    /// Search mode
    #[arg(long, value_enum)]
    pub mode: Option<SearchMode>,

    /// Only sources from this recency window
    #[arg(long, value_enum)]
    pub recency: Option<Recency>,

    /// Restrict to these domains (repeatable)
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SearchArgs, ctx: &Context) -> Result<()> {
    let api_key = require_api_key(ctx)?;
    let defaults = ctx.settings.defaults.clone().unwrap_or_default();
    let opts = SearchOptions::resolve(&args, &defaults);
    let client = Client::new(&api_key)?;

    let mut request = ChatRequest::new(
        "sonar",
        vec![
            Message::system(SEARCH_SYSTEM_PROMPT),
            Message::user(&args.query),
        ],
    );
    request.stream = Some(false);
    request.num_search_results = Some(opts.max_results);
    request.return_related_questions = Some(true);
    request.search_mode = opts.mode;
    request.search_recency_filter = opts.recency;
    if !opts.domains.is_empty() {
        request.search_domain_filter = Some(opts.domains.clone());
    }

    if !opts.json {
        eprintln!("⏳ Searching...");
    }

    let response = client.chat(&request).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let text = response.text();
    if !text.is_empty() {
        println!("{}", text.white());
    }

    match response.search_results.as_deref() {
        Some(results) if !results.is_empty() => {
            println!();
            println!("{}", "Search Results:\n".cyan());
            for (i, result) in results.iter().enumerate() {
                let num = format!("[{}]", i + 1).cyan();
                let title = result.title.as_deref().unwrap_or(&result.url);
                println!("  {num} {}", title.white());
                println!("      {}", result.url.blue());
                if let Some(snippet) = &result.snippet {
                    let short: String = snippet.chars().take(SNIPPET_LENGTH).collect();
                    println!("      {}", short.dimmed());
                }
                println!();
            }
        }
        _ => {
            // No structured results; fall back to bare citation URLs
            if let Some(citations) = response.citations.as_deref() {
                output::print_citations(Some(citations), None);
            }
        }
    }

    Ok(())
}
