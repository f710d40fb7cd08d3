//! `plx config` command
//!
//! Manage the API key and named defaults.
//!
//! # Usage
//! ```bash
//! plx config set-key pplx-...
//! plx config view-key
//! plx config set model sonar-pro
//! plx config set stream false
//! plx config get model
//! plx config list
//! plx config path
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::{Settings, DEFAULT_KEYS};
use crate::output;

use super::Context;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set the API key
    SetKey {
        /// The API key
        key: String,
    },

    /// View the currently set API key (masked)
    ViewKey,

    /// Remove the stored API key
    ClearKey,

    /// Set a default value (model, stream, searchMode, contextSize, language, safeSearch)
    Set {
        /// Config key
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a config value
    Get {
        /// Config key
        key: String,
    },

    /// Show all configuration
    List,

    /// Show the config directory path
    Path,
}

pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommands::SetKey { key } => set_key(&key, ctx),
        ConfigCommands::ViewKey => view_key(ctx),
        ConfigCommands::ClearKey => clear_key(ctx),
        ConfigCommands::Set { key, value } => set_default(&key, &value, ctx),
        ConfigCommands::Get { key } => get_value(&key, ctx),
        ConfigCommands::List => list(ctx),
        ConfigCommands::Path => {
            println!("{}", ctx.paths.config_dir().display());
            Ok(())
        }
    }
}

pub fn set_key(key: &str, ctx: &Context) -> Result<()> {
    let mut settings = Settings::load(&ctx.paths);
    settings.api_key = Some(key.to_string());
    settings.save(&ctx.paths)?;
    output::print_success("API key set successfully.");
    Ok(())
}

pub fn view_key(ctx: &Context) -> Result<()> {
    let settings = Settings::load(&ctx.paths);
    match &settings.api_key {
        Some(key) => {
            println!("{} {}", "API key:".blue(), mask_key(key).yellow());
            Ok(())
        }
        None => {
            output::print_error("No API key set. Run: plx config set-key <key>");
            Ok(())
        }
    }
}

pub fn clear_key(ctx: &Context) -> Result<()> {
    let mut settings = Settings::load(&ctx.paths);
    settings.api_key = None;
    settings.save(&ctx.paths)?;
    output::print_success("API key cleared.");
    Ok(())
}

fn set_default(key: &str, value: &str, ctx: &Context) -> Result<()> {
    let mut settings = Settings::load(&ctx.paths);
    let mut defaults = settings.defaults.take().unwrap_or_default();
    defaults.set(key, value)?;
    settings.defaults = Some(defaults);
    settings.save(&ctx.paths)?;
    output::print_success(&format!("Set {key} = {value}"));
    Ok(())
}

fn get_value(key: &str, ctx: &Context) -> Result<()> {
    let settings = Settings::load(&ctx.paths);

    if key == "apiKey" {
        println!(
            "{}",
            if settings.api_key.is_some() {
                "(set)"
            } else {
                "(not set)"
            }
        );
        return Ok(());
    }

    if !DEFAULT_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown config key: {key}. Valid keys: {}",
            DEFAULT_KEYS.join(", ")
        );
    }

    let value = settings.defaults.as_ref().and_then(|d| d.get(key));
    match value {
        Some(v) => println!("{v}"),
        None => println!("{}", "(not set)".dimmed()),
    }
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let settings = Settings::load(&ctx.paths);

    println!("{}", "Configuration:".cyan());
    println!(
        "  {} {}",
        "API key:".white(),
        if settings.api_key.is_some() {
            "set".green()
        } else {
            "not set".red()
        }
    );
    println!(
        "  {} {}",
        "Config path:".white(),
        ctx.paths.config_dir().display().to_string().dimmed()
    );

    if let Some(defaults) = &settings.defaults {
        // Serialize so stored-but-unrecognized keys show up too
        let map = serde_json::to_value(defaults)?;
        if let Some(map) = map.as_object() {
            if !map.is_empty() {
                println!();
                println!("{}", "Defaults:".cyan());
                for (key, value) in map {
                    let display = match value.as_str() {
                        Some(s) => s.to_string(),
                        None => value.to_string(),
                    };
                    println!("  {} {}", format!("{key}:").white(), display.yellow());
                }
            }
        }
    }

    Ok(())
}

/// Mask an API key for display, keeping the first and last four
/// characters of long keys.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_keys_keep_head_and_tail() {
        assert_eq!(mask_key("pplx-1234567890"), "pplx*******7890");
    }

    #[test]
    fn short_keys_are_fully_masked() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("12345678"), "****");
    }
}
