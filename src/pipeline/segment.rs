//! Segment summarizer, the terminal budget strategy.
//!
//! Splits the dialogue into [`SEGMENT_COUNT`] contiguous ranges and renders
//! each under a labeled header. Each segment numbers its user turns from
//! `segment_index × ceil(user_turns / SEGMENT_COUNT)`. That offset is an
//! approximation: it only lines up with the global numbering when user turns
//! are spread evenly across the segments.

use serde::Serialize;
use tracing::debug;

use super::compress::compress_response;
use super::render::{char_len, render_line};
use crate::constants::SEGMENT_COUNT;
use crate::dialogue::{Role, Turn};

/// A contiguous `[start, end)` range of turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// 0-based segment index.
    pub index: usize,
    pub start: usize,
    pub end: usize,
    /// First user number rendered inside this segment.
    pub user_offset: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Partitions `turn_count` turns into `SEGMENT_COUNT` ranges.
///
/// Every segment but the last gets `floor(turn_count / SEGMENT_COUNT)` turns;
/// the last one takes the remainder.
pub fn plan_segments(turn_count: usize, user_count: usize) -> Vec<Segment> {
    let size = turn_count / SEGMENT_COUNT;
    let users_per_segment = user_count.div_ceil(SEGMENT_COUNT);
    (0..SEGMENT_COUNT)
        .map(|index| {
            let start = index * size;
            let end = if index + 1 == SEGMENT_COUNT {
                turn_count
            } else {
                (index + 1) * size
            };
            Segment {
                index,
                start,
                end,
                user_offset: index * users_per_segment,
            }
        })
        .collect()
}

/// Renders all segments; the result may still exceed the budget.
pub fn summarize_segments(turns: &[Turn], segments: &[Segment]) -> String {
    let rendered: Vec<String> = segments
        .iter()
        .map(|segment| {
            let mut user_index = segment.user_offset;
            let body = turns[segment.start..segment.end]
                .iter()
                .map(|turn| match turn.role {
                    Role::User => {
                        let line = render_line(Role::User, user_index, &turn.text);
                        user_index += 1;
                        line
                    }
                    Role::Assistant => {
                        render_line(Role::Assistant, 0, &compress_response(&turn.text))
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n=== segment {} ===\n{body}", segment.index + 1)
        })
        .collect();

    let text = rendered.join("\n");
    debug!(
        turns = turns.len(),
        segments = segments.len(),
        chars = char_len(&text),
        "segmented dialogue"
    );
    text
}
