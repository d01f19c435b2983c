//! Dialogue commands: `analyze`, `plan` and `navigate`.
//!
//! Each loads a dialogue file, runs one stage of the pipeline and prints the
//! result either colored for the terminal or as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::analysis::{AnalysisSettings, Analyzer};
use crate::config::Config;
use crate::dialogue::{self, Turn};
use crate::format::{format_outcome, format_plan, PlanReport, Report};
use crate::pipeline::{self, question_navigator, AnalysisOutcome, UserIndexMap};
use crate::provider::{HttpProvider, ModelSelection};
use crate::tokens;

/// Runs the full analysis and prints the topic list.
pub(crate) async fn analyze(
    config: &Config,
    selection: &ModelSelection,
    file: &Path,
    json: bool,
) -> Result<()> {
    let turns = dialogue::load(file)?;
    let analyzer = Analyzer::new(
        HttpProvider::from_config(config, selection)?,
        AnalysisSettings {
            budget: config.budget_settings(),
            retry: config.retry_policy(),
        },
    );

    if !json {
        println!(
            "{} {} turns [provider: {}, model: {}]\n",
            "threadmap".bold().cyan(),
            turns.len(),
            analyzer.provider().kind().to_string().yellow(),
            analyzer.provider().model().yellow(),
        );
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let run = analyzer.analyze(&turns, &cancel).await?;

    if json {
        let report = Report {
            generated_at: Utc::now(),
            provider: Some(selection.provider.to_string()),
            model: Some(&selection.model),
            turn_count: turns.len(),
            strategy: run.plan.as_ref().map(|plan| plan.strategy),
            attempts: run.attempts,
            outcome: &run.outcome,
        };
        print_json(&report)
    } else {
        println!("{}", format_outcome(&run.outcome, &turns));
        Ok(())
    }
}

/// Prints the budget plan without contacting a provider.
pub(crate) fn plan(config: &Config, file: &Path, show_prompt: bool, json: bool) -> Result<()> {
    let turns = dialogue::load(file)?;
    let settings = config.budget_settings();
    let index_map = UserIndexMap::build(&turns);
    let plan = pipeline::plan(&turns, &index_map, &settings);
    let prompt = pipeline::assemble(&plan.bounded_text, turns.len());

    let estimated = tokens::estimate_tokens(plan.bounded_len(), settings.chars_per_token);
    let prompt_tokens = match tokens::count_tokens(&format!("{}\n{}", prompt.system, prompt.user)) {
        Ok(count) => Some(count),
        Err(err) => {
            debug!(error = %err, "tokenizer unavailable");
            None
        }
    };

    if json {
        print_json(&PlanReport {
            char_budget: settings.char_budget(),
            estimated_tokens: estimated,
            prompt_tokens,
            plan: &plan,
        })?;
    } else {
        print!("{}", format_plan(&plan, &settings, estimated, prompt_tokens));
    }

    if show_prompt {
        println!("\n{}\n{}", "--- system ---".dimmed(), prompt.system);
        println!("\n{}\n{}", "--- user ---".dimmed(), prompt.user);
    }
    Ok(())
}

/// Prints the deterministic question navigator.
pub(crate) fn navigate(file: &Path, json: bool) -> Result<()> {
    let turns = dialogue::load(file)?;
    let outcome = navigator_outcome(&turns);

    if json {
        print_json(&Report {
            generated_at: Utc::now(),
            provider: None,
            model: None,
            turn_count: turns.len(),
            strategy: None,
            attempts: 0,
            outcome: &outcome,
        })
    } else {
        println!("{}", format_outcome(&outcome, &turns));
        Ok(())
    }
}

fn navigator_outcome(turns: &[Turn]) -> AnalysisOutcome {
    AnalysisOutcome::from_fallback(question_navigator(turns), None)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{turns, Role};

    #[test]
    fn test_navigator_outcome_has_no_reason() {
        let dialogue = turns(&[(Role::User, "q"), (Role::Assistant, "a")]);
        let outcome = navigator_outcome(&dialogue);
        assert!(outcome.is_fallback);
        assert!(outcome.fallback_reason.is_none());
        assert_eq!(outcome.nodes.len(), 1);
    }
}
