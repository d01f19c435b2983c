//! Response reconciler: raw model output in, validated topic nodes out.
//!
//! The model numbers topics by relative user index; every index goes through
//! the [`UserIndexMap`] built for the same run before it becomes an ordinal.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::budget::Strategy;
use super::index_map::UserIndexMap;
use super::repair::{parse_with_repair, strip_fencing};
use super::topic::TopicNode;
use crate::error::FallbackReason;

/// Turns the raw model answer into topic nodes with absolute ordinals.
///
/// For the `none` and `compress` strategies every user turn ends up in some
/// node: turns the model left out join the node holding the closest earlier
/// user turn. The `segment` strategy numbers turns approximately, so its
/// omissions are only logged.
pub fn reconcile(
    raw: &str,
    index_map: &UserIndexMap,
    strategy: Strategy,
) -> Result<Vec<TopicNode>, FallbackReason> {
    let text = strip_fencing(raw);
    let (value, repaired) = parse_with_repair(text)
        .map_err(|err| FallbackReason::MalformedResponse(format!("invalid JSON: {err}")))?;
    if repaired {
        warn!("model response was truncated, recovered the complete nodes");
    }

    let raw_nodes = value
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| FallbackReason::MalformedResponse("missing `nodes` array".into()))?;

    let mut claimed = BTreeSet::new();
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for (position, raw_node) in raw_nodes.iter().enumerate() {
        let Some(fields) = raw_node.as_object() else {
            warn!(position, "skipping non-object topic node");
            continue;
        };
        let mut node = node_from_fields(fields, position, index_map);
        // an ordinal belongs to the first node that lists it
        node.turn_ordinals.retain(|ordinal| claimed.insert(*ordinal));
        if node.turn_ordinals.is_empty() {
            debug!(position, id = %node.id, "dropping topic node without mapped turns");
            continue;
        }
        nodes.push(node);
    }

    if nodes.is_empty() {
        return Err(FallbackReason::MalformedResponse(
            "no usable topic nodes".into(),
        ));
    }

    nodes.sort_by_key(|node| node.order);

    let uncovered: Vec<usize> = index_map
        .ordinals()
        .iter()
        .copied()
        .filter(|ordinal| !claimed.contains(ordinal))
        .collect();
    if !uncovered.is_empty() {
        if strategy == Strategy::Segment {
            warn!(
                missing = uncovered.len(),
                "segmented answer leaves user turns uncovered"
            );
        } else {
            warn!(
                missing = uncovered.len(),
                "model skipped user turns, attaching them to neighbouring topics"
            );
            attach_uncovered(&mut nodes, &uncovered);
        }
    }

    for (position, node) in nodes.iter_mut().enumerate() {
        node.turn_ordinals.sort_unstable();
        node.order = position + 1;
    }
    Ok(nodes)
}

fn node_from_fields(
    fields: &Map<String, Value>,
    position: usize,
    index_map: &UserIndexMap,
) -> TopicNode {
    let id = match fields.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => (position + 1).to_string(),
    };
    let title = string_field(fields, &["title", "topic"])
        .unwrap_or_else(|| format!("Topic {}", position + 1));
    let summary = string_field(fields, &["summary"]).unwrap_or_default();
    let order = ["order", "topicNumber"]
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(as_index)
        .unwrap_or(position + 1);

    let relative: Vec<i64> = fields
        .get("messageIndexes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(as_relative_index).collect())
        .unwrap_or_default();
    let turn_ordinals = index_map.remap(&relative);
    if turn_ordinals.len() < relative.len() {
        debug!(
            position,
            dropped = relative.len() - turn_ordinals.len(),
            "dropped out-of-range message indexes"
        );
    }

    TopicNode {
        id,
        title,
        summary,
        turn_ordinals,
        order,
        is_fallback: false,
    }
}

fn string_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn as_relative_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_index(value: &Value) -> Option<usize> {
    as_relative_index(value).and_then(|i| usize::try_from(i).ok())
}

/// Adds each uncovered ordinal to the node owning the closest smaller ordinal,
/// or to the first node when nothing precedes it.
fn attach_uncovered(nodes: &mut [TopicNode], uncovered: &[usize]) {
    let mut owners: Vec<(usize, usize)> = nodes
        .iter()
        .enumerate()
        .flat_map(|(idx, node)| node.turn_ordinals.iter().map(move |&o| (o, idx)))
        .collect();
    owners.sort_unstable();

    for &ordinal in uncovered {
        let preceding = owners.partition_point(|&(owned, _)| owned < ordinal);
        let target = if preceding == 0 {
            0
        } else {
            owners[preceding - 1].1
        };
        nodes[target].turn_ordinals.push(ordinal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{turns, Role};
    use crate::pipeline::topic::AnalysisOutcome;

    fn alternating(pairs: usize) -> Vec<crate::dialogue::Turn> {
        let specs: Vec<(Role, &str)> = (0..pairs * 2)
            .map(|i| {
                if i % 2 == 0 {
                    (Role::User, "question")
                } else {
                    (Role::Assistant, "answer")
                }
            })
            .collect();
        turns(&specs)
    }

    #[test]
    fn test_remaps_relative_indexes() {
        let dialogue = alternating(3);
        let map = UserIndexMap::build(&dialogue);
        let raw = r#"{"nodes":[{"id":"1","title":"t","messageIndexes":[0,1,2]}]}"#;
        let nodes = reconcile(raw, &map, Strategy::None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].turn_ordinals,
            vec![
                map.ordinal(0).unwrap(),
                map.ordinal(1).unwrap(),
                map.ordinal(2).unwrap()
            ]
        );
        assert!(!nodes[0].is_fallback);
        assert_eq!(nodes[0].title, "t");
    }

    #[test]
    fn test_unterminated_string_is_malformed() {
        let map = UserIndexMap::build(&alternating(2));
        let raw = r#"{"nodes":[{"id":"1","title":"unterminated"#;
        let err = reconcile(raw, &map, Strategy::None).unwrap_err();
        assert_eq!(err.to_string(), "malformed response");
    }

    #[test]
    fn test_missing_nodes_is_malformed() {
        let map = UserIndexMap::build(&alternating(2));
        let err = reconcile(r#"{"topics":[]}"#, &map, Strategy::None).unwrap_err();
        assert!(matches!(err, FallbackReason::MalformedResponse(_)));
    }

    #[test]
    fn test_fenced_truncated_answer_is_recovered() {
        let dialogue = alternating(4);
        let map = UserIndexMap::build(&dialogue);
        let raw = "```json\n{\"nodes\":[{\"id\":1,\"topic\":\"Setup\",\"messageIndexes\":[0,1]},{\"id\":2,\"topic\":\"Deb";
        let nodes = reconcile(raw, &map, Strategy::None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "1");
        assert_eq!(nodes[0].title, "Setup");
        // turns 2 and 3 were lost with the truncated node and get re-attached
        assert_eq!(nodes[0].turn_ordinals, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_no_duplicate_ordinals_across_nodes() {
        let dialogue = alternating(4);
        let map = UserIndexMap::build(&dialogue);
        let raw = r#"{"nodes":[
            {"id":"a","title":"A","messageIndexes":[0,1,1]},
            {"id":"b","title":"B","messageIndexes":[1,2,3,9]}
        ]}"#;
        let nodes = reconcile(raw, &map, Strategy::None).unwrap();
        let all: Vec<usize> = nodes.iter().flat_map(|n| n.turn_ordinals.clone()).collect();
        let unique: BTreeSet<usize> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(nodes[0].turn_ordinals, vec![0, 2]);
        assert_eq!(nodes[1].turn_ordinals, vec![4, 6]);
    }

    #[test]
    fn test_orphans_join_preceding_topic() {
        let dialogue = alternating(5);
        let map = UserIndexMap::build(&dialogue);
        let raw = r#"{"nodes":[
            {"id":"2","title":"Later","messageIndexes":[3],"order":2},
            {"id":"1","title":"Early","messageIndexes":[1],"order":1}
        ]}"#;
        let nodes = reconcile(raw, &map, Strategy::Compress).unwrap();
        assert_eq!(nodes[0].title, "Early");
        assert_eq!(nodes[0].order, 1);
        assert_eq!(nodes[0].turn_ordinals, vec![0, 2, 4]);
        assert_eq!(nodes[1].turn_ordinals, vec![6, 8]);

        let outcome = AnalysisOutcome::from_topics(nodes);
        let covered = outcome.covered_ordinals(&dialogue);
        assert_eq!(covered, (0..dialogue.len()).collect::<BTreeSet<usize>>());
    }

    #[test]
    fn test_segment_strategy_keeps_omissions() {
        let dialogue = alternating(3);
        let map = UserIndexMap::build(&dialogue);
        let raw = r#"{"nodes":[{"id":"1","title":"t","messageIndexes":["0"]}]}"#;
        let nodes = reconcile(raw, &map, Strategy::Segment).unwrap();
        assert_eq!(nodes[0].turn_ordinals, vec![0]);
    }

    #[test]
    fn test_all_indexes_out_of_range_is_malformed() {
        let map = UserIndexMap::build(&alternating(2));
        let raw = r#"{"nodes":[{"id":"1","title":"t","messageIndexes":[7,8]}]}"#;
        let err = reconcile(raw, &map, Strategy::None).unwrap_err();
        assert_eq!(err.detail(), Some("no usable topic nodes"));
    }
}
