//! Topic nodes and the analysis outcome handed back to callers.
//!
//! Everything here is plain serializable data so callers can cache it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dialogue::Turn;
use crate::error::FallbackReason;

/// One navigable topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicNode {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Absolute turn ordinals, ascending.
    pub turn_ordinals: Vec<usize>,
    /// 1-based display order.
    pub order: usize,
    pub is_fallback: bool,
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub nodes: Vec<TopicNode>,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl AnalysisOutcome {
    pub fn from_topics(nodes: Vec<TopicNode>) -> Self {
        Self {
            nodes,
            is_fallback: false,
            fallback_reason: None,
        }
    }

    pub fn from_fallback(nodes: Vec<TopicNode>, reason: Option<&FallbackReason>) -> Self {
        Self {
            nodes,
            is_fallback: true,
            fallback_reason: reason.map(ToString::to_string),
        }
    }

    /// Ordinals reachable from the nodes.
    ///
    /// A user ordinal also covers the assistant turns that answer it, up to the
    /// next user turn; assistant turns before the first user turn are covered
    /// only when a node lists them directly.
    pub fn covered_ordinals(&self, turns: &[Turn]) -> BTreeSet<usize> {
        let mut covered = BTreeSet::new();
        for &ordinal in self.nodes.iter().flat_map(|n| n.turn_ordinals.iter()) {
            covered.insert(ordinal);
            let Some(turn) = turns.get(ordinal) else {
                continue;
            };
            if turn.is_user() {
                covered.extend(
                    turns[ordinal + 1..]
                        .iter()
                        .take_while(|t| !t.is_user())
                        .map(|t| t.ordinal),
                );
            }
        }
        covered
    }
}
