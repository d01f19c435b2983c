//! Cleanup of raw model output before it is parsed as JSON.
//!
//! Models wrap JSON in code fences and, when they hit the output limit, stop
//! in the middle of a node. Truncated answers are cut back to the last node
//! that was closed and the enclosing containers are re-closed.

use serde_json::Value;
use tracing::debug;

/// Removes surrounding code fences and any prose before the first `{`.
pub fn strip_fencing(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();
    if !text.starts_with('{') {
        if let Some(start) = text.find('{') {
            return &text[start..];
        }
    }
    text
}

/// Parses `text`, falling back to [`repair_truncated`] when it is not valid JSON.
///
/// Returns the parse error of the original text when repair is impossible or
/// the repaired text still does not parse. The flag reports whether repair
/// was needed.
pub fn parse_with_repair(text: &str) -> Result<(Value, bool), serde_json::Error> {
    match serde_json::from_str(text) {
        Ok(value) => Ok((value, false)),
        Err(err) => {
            debug!(error = %err, "response is not valid JSON, attempting repair");
            let Some(repaired) = repair_truncated(text) else {
                return Err(err);
            };
            serde_json::from_str(&repaired).map(|value| (value, true))
        }
    }
}

/// Cuts `text` after the last object that closed directly inside an array and
/// appends the closers of every container still open at that point.
///
/// Returns `None` when no such object exists or the brackets are unbalanced.
pub fn repair_truncated(text: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut last_boundary: Option<(usize, Vec<char>)> = None;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => stack.push(ch),
            '}' => {
                if stack.pop() != Some('{') {
                    return None;
                }
                if stack.last() == Some(&'[') {
                    last_boundary = Some((idx + 1, stack.clone()));
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return None;
                }
            }
            _ => {}
        }
    }

    let (end, open) = last_boundary?;
    let mut repaired = text[..end].to_string();
    for opener in open.iter().rev() {
        repaired.push(if *opener == '{' { '}' } else { ']' });
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"nodes\": []}\n```";
        assert_eq!(strip_fencing(raw), "{\"nodes\": []}");
    }

    #[test]
    fn test_strip_bare_fence_and_prose() {
        assert_eq!(strip_fencing("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_fencing("Here you go: {\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_repair_cuts_to_last_complete_node() {
        let text = r#"{"nodes":[{"id":"1","messageIndexes":[0,1]},{"id":"2","title":"trunc"#;
        let repaired = repair_truncated(text).unwrap();
        assert_eq!(repaired, r#"{"nodes":[{"id":"1","messageIndexes":[0,1]}]}"#);
        let (value, was_repaired) = parse_with_repair(text).unwrap();
        assert!(was_repaired);
        assert_eq!(value["nodes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"nodes":[{"id":"1","title":"a } b"},{"id":"2","summary":"{ oops"#;
        let repaired = repair_truncated(text).unwrap();
        assert_eq!(repaired, r#"{"nodes":[{"id":"1","title":"a } b"}]}"#);
    }

    #[test]
    fn test_unterminated_first_node_cannot_be_repaired() {
        let text = r#"{"nodes":[{"id":"1","title":"never closed"#;
        assert!(repair_truncated(text).is_none());
        assert!(parse_with_repair(text).is_err());
    }

    #[test]
    fn test_valid_json_is_untouched() {
        let (value, repaired) = parse_with_repair(r#"{"nodes":[]}"#).unwrap();
        assert!(!repaired);
        assert!(value["nodes"].is_array());
    }
}
