//! Entry point for threadmap, a topic navigator for long AI chat transcripts.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! sets up logging and dispatches to the appropriate subcommand handler.

mod analysis;
mod cli;
mod config;
mod constants;
mod dialogue;
mod error;
mod format;
mod pipeline;
mod provider;
mod tokens;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the threadmap CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    init_logging(cli.verbose);
    cli::run(cli).await
}

/// Logs go to stderr so `--json` output on stdout stays clean.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
