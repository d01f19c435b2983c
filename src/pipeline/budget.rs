//! Budget planner: decides how much of the dialogue the prompt can carry.
//!
//! Escalation is two-tier and never skips a tier: the uncompressed preview is
//! used when it fits, otherwise the compressor runs, and only when its output
//! still overflows does the segment summarizer take over.

use serde::Serialize;
use tracing::{debug, info};

use super::compress::compress_dialogue;
use super::index_map::UserIndexMap;
use super::render::{char_len, render_preview};
use super::segment::{plan_segments, summarize_segments, Segment};
use crate::constants::{BUDGET_MARGIN_DEFAULT, CHARS_PER_TOKEN_DEFAULT, TOKEN_BUDGET_DEFAULT};
use crate::dialogue::Turn;

/// Budget knobs threaded in from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetSettings {
    /// Input token budget for the whole prompt.
    pub token_budget: usize,
    pub chars_per_token: f64,
    /// Fraction of the character budget the compressor may fill.
    pub margin: f64,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            token_budget: TOKEN_BUDGET_DEFAULT,
            chars_per_token: CHARS_PER_TOKEN_DEFAULT,
            margin: BUDGET_MARGIN_DEFAULT,
        }
    }
}

impl BudgetSettings {
    /// Character ceiling `B` for the bounded text.
    pub fn char_budget(&self) -> usize {
        (self.token_budget as f64 * self.chars_per_token) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    None,
    Compress,
    Segment,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::None => write!(f, "none"),
            Strategy::Compress => write!(f, "compress"),
            Strategy::Segment => write!(f, "segment"),
        }
    }
}

/// The bounded dialogue text and how it was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPlan {
    pub strategy: Strategy,
    pub bounded_text: String,
    /// Turns represented in `bounded_text`.
    pub turn_count: usize,
    /// Set for the `compress` strategy only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

impl BudgetPlan {
    pub fn bounded_len(&self) -> usize {
        char_len(&self.bounded_text)
    }
}

/// Picks a strategy for `turns` under `settings` and renders the bounded text.
pub fn plan(turns: &[Turn], index_map: &UserIndexMap, settings: &BudgetSettings) -> BudgetPlan {
    let budget = settings.char_budget();
    let preview = render_preview(turns);
    let preview_len = char_len(&preview);

    debug!(
        chars = preview_len,
        estimated_tokens = (preview_len as f64 / settings.chars_per_token).ceil() as usize,
        budget,
        user_turns = index_map.len(),
        "evaluating dialogue length"
    );

    if preview_len <= budget {
        return BudgetPlan {
            strategy: Strategy::None,
            bounded_text: preview,
            turn_count: turns.len(),
            compression_ratio: None,
            segments: Vec::new(),
        };
    }

    info!(chars = preview_len, budget, "dialogue over budget, compressing");
    let compressed = compress_dialogue(turns, budget, settings.margin);
    if char_len(&compressed.text) <= budget {
        return BudgetPlan {
            strategy: Strategy::Compress,
            bounded_text: compressed.text,
            turn_count: compressed.lines_kept,
            compression_ratio: Some(compressed.ratio),
            segments: Vec::new(),
        };
    }

    info!(
        chars = char_len(&compressed.text),
        budget, "compression not enough, segmenting"
    );
    let segments = plan_segments(turns.len(), index_map.len());
    let bounded_text = summarize_segments(turns, &segments);
    BudgetPlan {
        strategy: Strategy::Segment,
        bounded_text,
        turn_count: turns.len(),
        compression_ratio: None,
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{turns, Role};

    fn settings(token_budget: usize, margin: f64) -> BudgetSettings {
        BudgetSettings {
            token_budget,
            chars_per_token: 2.0,
            margin,
        }
    }

    #[test]
    fn test_default_char_budget() {
        assert_eq!(BudgetSettings::default().char_budget(), 12_000);
    }

    #[test]
    fn test_small_dialogue_is_passed_through_verbatim() {
        let dialogue = turns(&[
            (Role::User, "How do I sort a Vec?"),
            (Role::Assistant, "Use `sort` or `sort_by`."),
        ]);
        let map = UserIndexMap::build(&dialogue);
        let plan = plan(&dialogue, &map, &BudgetSettings::default());
        assert_eq!(plan.strategy, Strategy::None);
        assert_eq!(plan.bounded_text, render_preview(&dialogue));
        assert_eq!(plan.turn_count, 2);
    }

    #[test]
    fn test_long_dialogue_is_compressed() {
        let long = "detail ".repeat(80);
        let specs: Vec<(Role, &str)> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    (Role::User, "question?")
                } else {
                    (Role::Assistant, long.as_str())
                }
            })
            .collect();
        let dialogue = turns(&specs);
        let map = UserIndexMap::build(&dialogue);
        let plan = plan(&dialogue, &map, &settings(2000, 0.85));
        assert_eq!(plan.strategy, Strategy::Compress);
        assert!(plan.bounded_len() <= 4000);
        assert!(plan.compression_ratio.unwrap() < 1.0);
    }

    #[test]
    fn test_compressor_overflow_escalates_to_segments() {
        // a margin above 1.0 lets the compressor overshoot the budget
        let long = "detail ".repeat(80);
        let specs: Vec<(Role, &str)> = (0..30)
            .map(|i| {
                if i % 2 == 0 {
                    (Role::User, "question?")
                } else {
                    (Role::Assistant, long.as_str())
                }
            })
            .collect();
        let dialogue = turns(&specs);
        let map = UserIndexMap::build(&dialogue);
        let plan = plan(&dialogue, &map, &settings(500, 3.0));
        assert_eq!(plan.strategy, Strategy::Segment);
        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.turn_count, 30);
        assert!(plan.bounded_text.contains("=== segment 3 ==="));
    }
}
