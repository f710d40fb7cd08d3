//! plx CLI - Entry point
//!
//! Usage: plx <command> [options], or plx "question" as a shorthand for
//! plx query "question".

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plx::cli::{self, Cli, Commands, Context};
use plx::config::{Env, Paths, Settings};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Argument conveniences (implicit query, research shorthand) are a
    // preprocessing step ahead of clap
    let args = cli::preprocess_args(std::env::args().collect());
    let cli = Cli::parse_from(args);

    // Process-scoped context: one env snapshot, one path resolution, one
    // settings load
    let env = Env::from_process();
    let paths = Paths::resolve(&env);
    let settings = Settings::load(&paths);
    let ctx = Context {
        env,
        paths,
        settings,
        api_key: cli.api_key,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Query(args) => cli::query::run(args, &ctx).await,
        Commands::Search(args) => cli::search::run(args, &ctx).await,
        Commands::Research(args) => cli::research::run(args, &ctx).await,
        Commands::History(args) => cli::history::run(args, &ctx),
        Commands::Models(args) => cli::models::run(args),
        Commands::Config(args) => cli::config::run(args, &ctx),
        Commands::SetKey { key } => cli::config::set_key(&key, &ctx),
        Commands::ViewKey => cli::config::view_key(&ctx),
        Commands::ClearKey => cli::config::clear_key(&ctx),
    };

    if let Err(err) = result {
        cli::utils::report_error(&err, ctx.verbose);
        std::process::exit(1);
    }
}
