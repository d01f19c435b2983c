//! Terminal and JSON rendering of analysis results and budget plans.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::dialogue::Turn;
use crate::pipeline::render::truncate_chars;
use crate::pipeline::{AnalysisOutcome, BudgetPlan, BudgetSettings, Strategy, TopicNode};
use crate::tokens::{format_number, format_token_usage, DANGER_THRESHOLD, WARN_THRESHOLD};

const PREVIEW_MAX: usize = 80;

/// JSON document printed by `analyze --json` and `navigate --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub turn_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: &'a AnalysisOutcome,
}

/// JSON document printed by `plan --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport<'a> {
    pub char_budget: usize,
    pub estimated_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<usize>,
    #[serde(flatten)]
    pub plan: &'a BudgetPlan,
}

/// Format a topic list for terminal display.
pub fn format_outcome(outcome: &AnalysisOutcome, turns: &[Turn]) -> String {
    let mut out = String::new();

    if outcome.nodes.is_empty() {
        out.push_str(&format!("{}", "No turns to navigate.".dimmed()));
        return out;
    }

    let header = if outcome.is_fallback {
        let reason = outcome.fallback_reason.as_deref().unwrap_or("fallback");
        format!(
            "{} {}",
            "Question navigator".bold(),
            format!("({reason})").yellow()
        )
    } else {
        format!("{}", "Topics".bold())
    };
    out.push_str(&header);
    out.push('\n');

    for node in &outcome.nodes {
        out.push('\n');
        out.push_str(&format_node(node, turns));
    }

    let covered = outcome.covered_ordinals(turns).len();
    out.push_str(&format!(
        "\n{}",
        format!("{covered} of {} turns covered", turns.len()).dimmed()
    ));
    out
}

fn format_node(node: &TopicNode, turns: &[Turn]) -> String {
    let mut out = format!(
        "{} {}  {}",
        format!("{:>2}.", node.order).cyan(),
        node.title.bold(),
        format!("[{}]", format_ordinals(&node.turn_ordinals)).dimmed()
    );
    if !node.summary.is_empty() {
        out.push_str(&format!("\n    {}", node.summary));
    }
    let first_question = node
        .turn_ordinals
        .iter()
        .filter_map(|&ordinal| turns.get(ordinal))
        .find(|turn| turn.is_user());
    if let Some(turn) = first_question {
        // fallback titles already are the question
        if !node.is_fallback {
            let preview = truncate_chars(&turn.text.replace('\n', " "), PREVIEW_MAX);
            out.push_str(&format!("\n    {} {}", ">".green(), preview.dimmed()));
        }
    }
    out.push('\n');
    out
}

/// Compact ordinal list: consecutive runs collapse to `a-b`.
pub fn format_ordinals(ordinals: &[usize]) -> String {
    let mut parts = Vec::new();
    let mut iter = ordinals.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if end == start {
            parts.push(format!("#{start}"));
        } else {
            parts.push(format!("#{start}-{end}"));
        }
    }
    parts.join(", ")
}

/// Format a budget plan for terminal display.
pub fn format_plan(
    plan: &BudgetPlan,
    settings: &BudgetSettings,
    estimated_tokens: usize,
    prompt_tokens: Option<usize>,
) -> String {
    let strategy = match plan.strategy {
        Strategy::None => plan.strategy.to_string().green(),
        Strategy::Compress => plan.strategy.to_string().yellow(),
        Strategy::Segment => plan.strategy.to_string().red(),
    };

    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "Strategy:".bold(), strategy));
    out.push_str(&format!(
        "{} {}\n",
        "Turns:".bold(),
        format_number(plan.turn_count)
    ));
    out.push_str(&format!(
        "{} {} chars\n",
        "Dialogue:".bold(),
        format_token_usage(plan.bounded_len(), settings.char_budget())
    ));
    out.push_str(&format!(
        "{} {}\n",
        "Estimated tokens:".bold(),
        usage_colored(estimated_tokens, settings.token_budget)
    ));
    if let Some(tokens) = prompt_tokens {
        out.push_str(&format!(
            "{} {}\n",
            "Prompt tokens (cl100k):".bold(),
            format_number(tokens)
        ));
    }
    if let Some(ratio) = plan.compression_ratio {
        out.push_str(&format!(
            "{} {:.0}%\n",
            "Compression:".bold(),
            ratio * 100.0
        ));
    }
    for segment in &plan.segments {
        out.push_str(&format!(
            "  segment {}: {} turns (#{}..#{}), user offset {}\n",
            segment.index + 1,
            segment.len(),
            segment.start,
            segment.end,
            segment.user_offset
        ));
    }
    out
}

fn usage_colored(used: usize, limit: usize) -> String {
    let text = format_token_usage(used, limit);
    let ratio = if limit == 0 {
        1.0
    } else {
        used as f64 / limit as f64
    };
    if ratio >= DANGER_THRESHOLD {
        text.red().to_string()
    } else if ratio >= WARN_THRESHOLD {
        text.yellow().to_string()
    } else {
        text
    }
}
