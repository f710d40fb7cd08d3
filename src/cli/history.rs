//! `plx history` command
//!
//! Lists recent queries or conversation threads, and clears both stores.
//!
//! # Usage
//! ```bash
//! plx history
//! plx history --limit 5
//! plx history --threads
//! plx history --clear --yes
//! ```

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Args;
use colored::Colorize;
use dialoguer::Confirm;

use crate::output;
use crate::remote::types::Role;
use crate::store::{HistoryStore, ThreadStore};

use super::Context;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of entries to show
    #[arg(long, default_value_t = 20, value_name = "N")]
    pub limit: usize,

    /// Clear all history and threads
    #[arg(long)]
    pub clear: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show conversation threads instead of queries
    #[arg(long)]
    pub threads: bool,
}

pub fn run(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let history = HistoryStore::new(&ctx.paths);
    let threads = ThreadStore::new(&ctx.paths);

    if args.clear {
        if !args.yes {
            let confirmed = Confirm::new()
                .with_prompt("Clear all query history and conversation threads?")
                .default(false)
                .interact()?;
            if !confirmed {
                output::print_warning("Aborted.");
                return Ok(());
            }
        }

        history.clear()?;
        threads.clear_all()?;
        output::print_success("History and threads cleared.");
        return Ok(());
    }

    if args.threads {
        return list_threads(&threads, args.json);
    }

    let entries = history.list();
    if entries.is_empty() {
        output::print_warning("No query history found.");
        return Ok(());
    }

    let entries = &entries[..entries.len().min(args.limit)];

    if args.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    println!("{}", "Recent Queries:\n".cyan());
    for entry in entries {
        println!("  {}", entry.question.white());

        let mut meta = vec![format_epoch_millis(entry.timestamp), entry.model.clone()];
        if let Some(citations) = entry.citations {
            meta.push(format!("{citations} sources"));
        }
        println!("  {}", meta.join(" | ").dimmed());

        if let Some(preview) = &entry.response_preview {
            let short: String = preview.chars().take(100).collect();
            let ellipsis = if preview.chars().count() > 100 { "..." } else { "" };
            println!("  {}", format!("{short}{ellipsis}").dimmed());
        }
        println!();
    }

    Ok(())
}

fn list_threads(threads: &ThreadStore, json: bool) -> Result<()> {
    let all = threads.list_all();
    if all.is_empty() {
        output::print_warning("No conversation threads found.");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    println!("{}", "Conversation Threads:\n".cyan());
    for thread in &all {
        let preview = thread
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| {
                let short: String = m.content.chars().take(80).collect();
                let ellipsis = if m.content.chars().count() > 80 { "..." } else { "" };
                format!("{short}{ellipsis}")
            })
            .unwrap_or_else(|| "(empty)".to_string());

        let short_id: String = thread.id.chars().take(8).collect();
        println!("  {}", short_id.yellow());
        println!("  {}", preview.white());
        println!(
            "  {}",
            format!(
                "{} | {} | {} messages",
                format_epoch_millis(thread.updated),
                thread.model,
                thread.messages.len()
            )
            .dimmed()
        );
        println!();
    }

    println!(
        "{}",
        "Continue a thread with: plx query \"question\" --thread <id>".dimmed()
    );
    Ok(())
}

fn format_epoch_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}
