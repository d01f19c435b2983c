//! Question navigator: deterministic topics when the model cannot be used.
//!
//! One node per user turn, paired with the assistant reply that directly
//! follows it.

use tracing::info;

use super::render::truncate_chars;
use super::topic::TopicNode;
use crate::constants::{FALLBACK_NO_REPLY, FALLBACK_SUMMARY_MAX, FALLBACK_TITLE_MAX};
use crate::dialogue::Turn;

pub fn question_navigator(turns: &[Turn]) -> Vec<TopicNode> {
    let mut nodes = Vec::new();

    for (idx, turn) in turns.iter().enumerate() {
        if !turn.is_user() {
            continue;
        }
        let reply = turns.get(idx + 1).filter(|next| !next.is_user());
        let order = nodes.len() + 1;

        let mut turn_ordinals = vec![turn.ordinal];
        if let Some(reply) = reply {
            turn_ordinals.push(reply.ordinal);
        }

        nodes.push(TopicNode {
            id: format!("q{order}"),
            title: truncate_chars(&turn.text, FALLBACK_TITLE_MAX),
            summary: reply
                .map(|r| truncate_chars(&r.text, FALLBACK_SUMMARY_MAX))
                .unwrap_or_else(|| FALLBACK_NO_REPLY.to_string()),
            turn_ordinals,
            order,
            is_fallback: true,
        });
    }

    if nodes.is_empty() {
        if let Some(first) = turns.first() {
            // assistant-only transcript: one node so the list is never empty
            nodes.push(TopicNode {
                id: "q1".to_string(),
                title: truncate_chars(&first.text, FALLBACK_TITLE_MAX),
                summary: FALLBACK_NO_REPLY.to_string(),
                turn_ordinals: turns.iter().map(|t| t.ordinal).collect(),
                order: 1,
                is_fallback: true,
            });
        }
    }

    info!(nodes = nodes.len(), "built question navigator");
    nodes
}
