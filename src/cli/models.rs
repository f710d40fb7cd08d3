//! `plx models` command
//!
//! Lists the known model catalog. The catalog is informational: any model
//! name is accepted by `--model`, this just documents the common ones.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ModelInfo {
    #[tabled(rename = "Model")]
    pub name: &'static str,

    #[tabled(rename = "Type")]
    pub kind: &'static str,

    #[tabled(rename = "Description")]
    pub description: &'static str,

    #[tabled(rename = "Pricing")]
    pub pricing: &'static str,
}

pub const MODELS: [ModelInfo; 4] = [
    ModelInfo {
        name: "sonar",
        kind: "Search",
        description: "Lightweight search with real-time web grounding",
        pricing: "$1 / $1 per 1M tokens",
    },
    ModelInfo {
        name: "sonar-pro",
        kind: "Search",
        description: "Advanced search for complex queries, 2x citations",
        pricing: "$3 / $15 per 1M tokens",
    },
    ModelInfo {
        name: "sonar-reasoning-pro",
        kind: "Reasoning",
        description: "Chain of Thought reasoning (DeepSeek-R1)",
        pricing: "Premium tier",
    },
    ModelInfo {
        name: "sonar-deep-research",
        kind: "Research",
        description: "Expert-level research with exhaustive web analysis",
        pricing: "Premium tier",
    },
];

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ModelsArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&MODELS)?);
        return Ok(());
    }

    println!("{}", "Available Models:\n".cyan());

    let mut table = Table::new(MODELS);
    table.with(Style::psql());
    println!("{table}");

    println!();
    println!(
        "{}",
        "Use with: plx query \"question\" --model <model-name>".dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_includes_the_default_and_research_models() {
        let names: Vec<_> = MODELS.iter().map(|m| m.name).collect();
        assert!(names.contains(&crate::config::DEFAULT_MODEL));
        assert!(names.contains(&"sonar-deep-research"));
    }
}
