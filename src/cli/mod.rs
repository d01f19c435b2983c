//! Command-line interface definition and dispatch for threadmap.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; dialogue commands live in the [`dialogue`] submodule.

mod dialogue;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::{config, provider};

/// Top-level CLI structure for threadmap.
#[derive(Parser)]
#[command(
    name = "threadmap",
    version,
    about = "Split long AI chat transcripts into navigable topics"
)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the threadmap CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Extract topics from a dialogue file with an LLM
    Analyze {
        /// Dialogue JSON file (`-` reads stdin)
        file: PathBuf,
        /// Provider to use (moonshot, anthropic, openai, openrouter, ollama)
        #[arg(short, long)]
        provider: Option<String>,
        /// Model to use (overrides config, accepts provider/model)
        #[arg(short, long)]
        model: Option<String>,
        /// Token budget for the dialogue part of the prompt
        #[arg(long)]
        budget_tokens: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a dialogue would be budgeted, without calling a provider
    Plan {
        /// Dialogue JSON file (`-` reads stdin)
        file: PathBuf,
        /// Token budget for the dialogue part of the prompt
        #[arg(long)]
        budget_tokens: Option<usize>,
        /// Print the assembled system and user prompts
        #[arg(long)]
        show_prompt: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the question navigator without calling a provider
    Navigate {
        /// Dialogue JSON file (`-` reads stdin)
        file: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List providers, their models and key status
    Providers,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the merged config with API keys redacted
    Show,
    /// Print the global config file path
    Path,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            file,
            provider: provider_name,
            model,
            budget_tokens,
            json,
        } => {
            let config = load_with_budget(budget_tokens)?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;
            dialogue::analyze(&config, &selection, &file, json).await
        }
        Commands::Plan {
            file,
            budget_tokens,
            show_prompt,
            json,
        } => {
            let config = load_with_budget(budget_tokens)?;
            dialogue::plan(&config, &file, show_prompt, json)
        }
        Commands::Navigate { file, json } => dialogue::navigate(&file, json),
        Commands::Providers => {
            let config = config::Config::load()?;
            provider::list_providers(&config).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = config::Config::load()?;
                let toml_str = toml::to_string_pretty(&config.redacted())
                    .context("Failed to serialize config")?;
                println!("{toml_str}");
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", config::Config::config_path()?.display());
                Ok(())
            }
        },
    }
}

/// Loads the config and applies a `--budget-tokens` override.
fn load_with_budget(budget_tokens: Option<usize>) -> Result<config::Config> {
    let mut config = config::Config::load()?;
    if let Some(tokens) = budget_tokens {
        anyhow::ensure!(tokens > 0, "--budget-tokens must be greater than zero");
        config.budget.token_budget = Some(tokens);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "threadmap",
            "analyze",
            "chat.json",
            "--provider",
            "anthropic",
            "--budget-tokens",
            "3000",
            "--json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                file,
                provider,
                budget_tokens,
                json,
                ..
            } => {
                assert_eq!(file, PathBuf::from("chat.json"));
                assert_eq!(provider.as_deref(), Some("anthropic"));
                assert_eq!(budget_tokens, Some(3000));
                assert!(json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["threadmap", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["threadmap", "plan"]).is_err());
    }
}
