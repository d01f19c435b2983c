//! Per-message compression for the `compress` budget strategy.
//!
//! User turns are cut hard, assistant answers are first shrunk structurally
//! (head, key middle lines, tail) and then cut at a sentence boundary. The
//! dialogue-level pass keeps lines until the margin of the budget is reached
//! and drops the rest.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::render::{char_len, char_prefix, cut_at_boundary, render_line};
use crate::constants::{
    ASSISTANT_MIN_SENTENCE_CUT, ASSISTANT_TEXT_CUT, ASSISTANT_TEXT_MAX, ELLIPSIS, RESPONSE_CUT,
    RESPONSE_EMPTY_FALLBACK, RESPONSE_KEEP_AS_IS, RESPONSE_MAX, RESPONSE_MIN_BOUNDARY,
    RESPONSE_SHORT_CUT, RESPONSE_SHORT_MAX, USER_TEXT_CUT, USER_TEXT_MAX,
};
use crate::dialogue::{Role, Turn};

const HEAD_LINES: usize = 3;
const TAIL_LINES: usize = 3;
const MAX_KEY_LINES: usize = 3;

/// Lines worth keeping from the middle of a long answer.
static KEY_LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(总结|要点|重点|核心|关键|结论|答案|解决方案|(?i:summary|key points?|conclusion|answer|solution))[:：]",
        r"^[0-9]+[.、]",
        r"^[•\-*]",
        r"^#+\s",
        r"(建议|推荐|注意|重要|关键|错误|问题|解决|方法|步骤)",
        r"(?i)\b(suggest|recommend|note|important|key|error|problem|solve|method|step)",
        r"(因此|所以|总之|综上|最后|最终)",
        r"(?i)\b(therefore|thus|in summary|in conclusion|finally|overall)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("key line pattern is valid"))
    .collect()
});

fn is_key_line(line: &str) -> bool {
    KEY_LINE_PATTERNS.iter().any(|re| re.is_match(line))
}

/// Shrinks one assistant answer while keeping its shape.
pub fn compress_response(content: &str) -> String {
    if char_len(content) <= RESPONSE_KEEP_AS_IS {
        return content.to_string();
    }

    let lines: Vec<&str> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() <= 4 {
        if char_len(content) <= RESPONSE_SHORT_MAX {
            return content.to_string();
        }
        return cut_at_boundary(
            content,
            RESPONSE_SHORT_CUT,
            &['。', '.', '！', '？'],
            RESPONSE_MIN_BOUNDARY,
        );
    }

    let total = lines.len();
    let mut kept: Vec<&str> = lines[..HEAD_LINES].to_vec();

    if total > HEAD_LINES + TAIL_LINES {
        let middle = &lines[HEAD_LINES..total - TAIL_LINES];
        let key_lines: Vec<&str> = middle
            .iter()
            .copied()
            .filter(|line| is_key_line(line))
            .take(MAX_KEY_LINES)
            .collect();

        if !key_lines.is_empty() {
            kept.push(ELLIPSIS);
            kept.extend(key_lines);
        } else if !middle.is_empty() {
            kept.push(ELLIPSIS);
            let mid = middle.len() / 2;
            kept.push(middle[mid.saturating_sub(1)]);
            if middle.len() > 1 {
                kept.push(middle[mid]);
            }
        }
    }

    if kept.len() > HEAD_LINES {
        kept.push(ELLIPSIS);
    }
    kept.extend(&lines[(total - TAIL_LINES).max(HEAD_LINES)..]);

    let joined = kept.join("\n");
    if char_len(&joined) >= char_len(content) {
        return content.to_string();
    }
    let result = if char_len(&joined) > RESPONSE_MAX {
        cut_at_boundary(&joined, RESPONSE_CUT, &['。', '.', '\n'], RESPONSE_MIN_BOUNDARY)
    } else {
        joined
    };

    if result.is_empty() {
        format!("{}{ELLIPSIS}", char_prefix(content, RESPONSE_EMPTY_FALLBACK))
    } else {
        result
    }
}

/// Applies the per-message length limits for the `compress` strategy.
pub fn compress_turn_text(turn: &Turn) -> String {
    match turn.role {
        Role::User => {
            if char_len(&turn.text) > USER_TEXT_MAX {
                format!("{}{ELLIPSIS}", char_prefix(&turn.text, USER_TEXT_CUT))
            } else {
                turn.text.clone()
            }
        }
        Role::Assistant => {
            let content = compress_response(&turn.text);
            if char_len(&content) > ASSISTANT_TEXT_MAX {
                cut_at_boundary(
                    &content,
                    ASSISTANT_TEXT_CUT,
                    &['。', '.'],
                    ASSISTANT_MIN_SENTENCE_CUT,
                )
            } else {
                content
            }
        }
    }
}

/// Output of the dialogue-level compression pass.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub text: String,
    /// Number of turns that made it into `text`.
    pub lines_kept: usize,
    /// `text` length over the concatenated length of all original turn texts.
    pub ratio: f64,
}

/// Compresses every turn and keeps lines until `margin × char_budget` is reached.
///
/// Turns past the first line that does not fit are dropped.
pub fn compress_dialogue(turns: &[Turn], char_budget: usize, margin: f64) -> Compressed {
    let target = char_budget as f64 * margin;
    let mut lines = Vec::new();
    let mut current = 0usize;
    let mut user_index = 0usize;

    for turn in turns {
        let line = render_line(turn.role, user_index, &compress_turn_text(turn));
        if turn.is_user() {
            user_index += 1;
        }

        let len = char_len(&line);
        if (current + len) as f64 > target {
            debug!(
                stopped_at = turn.ordinal,
                dropped = turns.len() - lines.len(),
                "compression reached budget margin"
            );
            break;
        }
        current += len + 1;
        lines.push(line);
    }

    let text = lines.join("\n");
    let original: usize = turns.iter().map(|t| char_len(&t.text)).sum();
    let ratio = if original == 0 {
        0.0
    } else {
        char_len(&text) as f64 / original as f64
    };

    debug!(
        turns = turns.len(),
        kept = lines.len(),
        chars = char_len(&text),
        ratio,
        "compressed dialogue"
    );

    Compressed {
        lines_kept: lines.len(),
        text,
        ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::turns;

    fn long_answer(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("Line {i} talks about something fairly long in plain words"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_short_response_unchanged() {
        let text = "A short answer.";
        assert_eq!(compress_response(text), text);
    }

    #[test]
    fn test_few_lines_under_400_unchanged() {
        let text = "x".repeat(380);
        assert_eq!(compress_response(&text), text);
    }

    #[test]
    fn test_few_lines_cut_at_sentence() {
        let text = format!("{}. {}", "a".repeat(300), "b".repeat(200));
        let out = compress_response(&text);
        assert_eq!(out, format!("{}....", "a".repeat(300)));
    }

    #[test]
    fn test_many_lines_keeps_head_and_tail() {
        let text = long_answer(12);
        let out = compress_response(&text);
        assert!(out.starts_with("Line 0"));
        assert!(out.contains(ELLIPSIS));
        assert!(char_len(&out) <= RESPONSE_MAX + ELLIPSIS.len());
        assert!(char_len(&out) <= char_len(&text));
    }

    #[test]
    fn test_key_lines_preferred_from_middle() {
        let mut lines: Vec<String> = (0..4).map(|i| format!("intro {i}")).collect();
        lines.push("- bullet point worth keeping".to_string());
        lines.push("filler".to_string());
        lines.push("Therefore we conclude".to_string());
        lines.extend((0..3).map(|i| format!("outro {i}")));
        lines.push("z".repeat(150));
        let text = lines.join("\n");
        let out = compress_response(&text);
        assert!(out.contains("- bullet point worth keeping"));
        assert!(out.contains("Therefore we conclude"));
        assert!(!out.contains("filler"));
    }

    #[test]
    fn test_midpoint_lines_without_key_lines() {
        let mut lines: Vec<String> = (0..3)
            .map(|i| format!("head{i} {}", "h".repeat(40)))
            .collect();
        lines.extend(["mid a", "mid b", "mid c", "mid d"].map(String::from));
        lines.extend((0..3).map(|i| format!("tail{i} {}", "t".repeat(40))));
        let text = lines.join("\n");
        let out = compress_response(&text);
        assert!(out.contains("mid b\nmid c"));
        assert!(!out.contains("mid a"));
    }

    #[test]
    fn test_compression_shrinks_multiline_answers() {
        for n in [5, 7, 20, 60] {
            let text = long_answer(n);
            let out = compress_response(&text);
            assert!(char_len(&out) <= char_len(&text));
            assert!(char_len(&out) <= RESPONSE_MAX + ELLIPSIS.len(), "{n} lines");
        }
    }

    #[test]
    fn test_answer_that_would_grow_is_kept() {
        let text = (0..7)
            .map(|i| format!("Line {i} is about forty characters long.."))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(char_len(&text) > RESPONSE_KEEP_AS_IS);
        assert_eq!(compress_response(&text), text);

        let eight = format!("{text}\nLine 7 is about forty characters long..");
        assert_eq!(compress_response(&eight), eight);
    }

    #[test]
    fn test_user_turn_cut_at_145() {
        let dialogue = turns(&[(Role::User, &"q".repeat(200))]);
        let out = compress_turn_text(&dialogue[0]);
        assert_eq!(char_len(&out), USER_TEXT_CUT + ELLIPSIS.len());
    }

    #[test]
    fn test_assistant_turn_capped_near_300() {
        let text = "word ".repeat(100);
        let dialogue = turns(&[(Role::Assistant, &text)]);
        let out = compress_turn_text(&dialogue[0]);
        assert!(char_len(&out) <= ASSISTANT_TEXT_CUT + ELLIPSIS.len());
    }

    #[test]
    fn test_compress_dialogue_drops_tail_past_margin() {
        let q = "q".repeat(100);
        let specs: Vec<(Role, &str)> = (0..40)
            .map(|i| {
                if i % 2 == 0 {
                    (Role::User, q.as_str())
                } else {
                    (Role::Assistant, "ok")
                }
            })
            .collect();
        let dialogue = turns(&specs);
        let out = compress_dialogue(&dialogue, 1000, 0.85);
        assert!(char_len(&out.text) <= 850);
        assert!(out.lines_kept < dialogue.len());
        assert!(out.text.starts_with("[0] user: "));
        assert!(out.ratio > 0.0);
    }
}
