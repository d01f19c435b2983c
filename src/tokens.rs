//! Token counting for threadmap.
//!
//! The budget planner works in characters with a conservative ratio; this
//! module measures the assembled prompt with a real BPE tokenizer so `plan`
//! can show how close the estimate is. cl100k_base stands in for every
//! provider.

use anyhow::{Context, Result};

/// Count tokens for a text string with the cl100k_base tokenizer.
pub fn count_tokens(text: &str) -> Result<usize> {
    let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base tokenizer")?;
    Ok(bpe.encode_ordinary(text).len())
}

/// Token estimate from a character count, the way the budget planner sees it.
pub fn estimate_tokens(chars: usize, chars_per_token: f64) -> usize {
    if chars_per_token <= 0.0 {
        return chars;
    }
    (chars as f64 / chars_per_token).ceil() as usize
}

/// Format a token count for display. Example: "1,234 / 6,000"
pub fn format_token_usage(used: usize, limit: usize) -> String {
    format!("{} / {}", format_number(used), format_number(limit))
}

pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub const WARN_THRESHOLD: f64 = 0.80;
pub const DANGER_THRESHOLD: f64 = 0.95;
