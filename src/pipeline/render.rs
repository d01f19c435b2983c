//! Line rendering and char-based text helpers shared by the budget strategies.
//!
//! Every length in the pipeline is counted in `char`s, so a CJK transcript and
//! an English one of the same visible length get the same budget.

use crate::constants::ELLIPSIS;
use crate::dialogue::{Role, Turn};

/// Renders one dialogue line. Only user turns carry a `[i]` number.
pub fn render_line(role: Role, user_index: usize, text: &str) -> String {
    match role {
        Role::User => format!("[{user_index}] user: {text}"),
        Role::Assistant => format!("assistant: {text}"),
    }
}

/// Renders the whole dialogue uncompressed, one line per turn.
pub fn render_preview(turns: &[Turn]) -> String {
    let mut user_index = 0;
    let mut lines = Vec::with_capacity(turns.len());
    for turn in turns {
        lines.push(render_line(turn.role, user_index, &turn.text));
        if turn.is_user() {
            user_index += 1;
        }
    }
    lines.join("\n")
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `n` chars of `s` (all of `s` when shorter).
pub fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// Keeps at most `max` chars, appending the ellipsis when anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if char_len(s) > max {
        format!("{}{ELLIPSIS}", char_prefix(s, max))
    } else {
        s.to_string()
    }
}

/// Cuts `s` inside its first `window` chars and appends the ellipsis.
///
/// The cut lands just after the last `boundaries` char in the window when that
/// char sits past `min_index`; otherwise the whole window is kept.
pub fn cut_at_boundary(s: &str, window: usize, boundaries: &[char], min_index: usize) -> String {
    let prefix = char_prefix(s, window);
    let last = prefix
        .char_indices()
        .filter(|(_, c)| boundaries.contains(c))
        .last();
    if let Some((byte, ch)) = last {
        if char_len(&prefix[..byte]) > min_index {
            return format!("{}{ELLIPSIS}", &prefix[..byte + ch.len_utf8()]);
        }
    }
    format!("{prefix}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::turns;

    #[test]
    fn test_render_preview_numbers_only_user_turns() {
        let dialogue = turns(&[
            (Role::User, "hi"),
            (Role::Assistant, "hello"),
            (Role::User, "bye"),
        ]);
        assert_eq!(
            render_preview(&dialogue),
            "[0] user: hi\nassistant: hello\n[1] user: bye"
        );
    }

    #[test]
    fn test_char_prefix_respects_multibyte() {
        assert_eq!(char_prefix("你好世界", 2), "你好");
        assert_eq!(char_prefix("abc", 10), "abc");
    }

    #[test]
    fn test_cut_at_boundary_prefers_sentence_end() {
        let text = format!("{}. {}", "a".repeat(20), "b".repeat(40));
        assert_eq!(
            cut_at_boundary(&text, 30, &['.'], 10),
            format!("{}....", "a".repeat(20))
        );
        // boundary too early: hard cut
        assert_eq!(
            cut_at_boundary(&text, 30, &['.'], 25),
            format!("{}...", char_prefix(&text, 30))
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}
