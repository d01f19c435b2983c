//! Prompt assembly for the topic-segmentation call.

use crate::constants::{MIN_TURNS_PER_TOPIC, TOPICS_MAX, TOPICS_MIN, TURNS_PER_TOPIC_HINT};

/// Instructions sent as the system prompt.
///
/// The `messageIndexes` contract here is what the reconciler relies on: the
/// model answers with the bracketed user numbers, never raw positions.
pub const SYSTEM_PROMPT: &str = r#"You are an expert in analysing conversation topics. Your task is to split a complete conversation between a user and an AI assistant into a few coherent, meaningful topics, based on context and semantics.

Output strictly valid JSON in this format:
{
  "nodes": [
    {
      "id": "1",
      "title": "Topic name (short and precise)",
      "summary": "What this topic covered, based on the assistant's answers (under 100 words)",
      "messageIndexes": [0, 1, 2, 3],
      "order": 1
    }
  ]
}

Core requirements:
1. Topic coherence: only start a new topic when the focus of the conversation changes substantially. Merge related follow-up questions into the same topic; merging beats splitting.
2. Summaries: `summary` must be grounded in what the assistant actually answered: key information, solutions, or conclusions.
3. Accurate indexes: `messageIndexes` lists the bracketed numbers ([0], [1], ...) of every user message that belongs to the topic.
4. Full coverage (most important!): no message may be left out. Every numbered message from the first to the last must be assigned to exactly one node. An answer that omits any message counts as a complete failure.
5. Reply with the JSON object only, no prose and no code fences."#;

/// Topic count guidance derived from the dialogue length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicTarget {
    pub target: usize,
    pub min: usize,
    pub max: usize,
    pub min_turns_per_topic: usize,
}

impl TopicTarget {
    /// `target = clamp(ceil(turns / 8), 3, 6)`, range `[ceil(0.7 × target), target + 1]`.
    pub fn for_turns(total_turns: usize) -> Self {
        let target = total_turns
            .div_ceil(TURNS_PER_TOPIC_HINT)
            .clamp(TOPICS_MIN, TOPICS_MAX);
        Self {
            target,
            min: (target as f64 * 0.7).ceil() as usize,
            max: target + 1,
            min_turns_per_topic: MIN_TURNS_PER_TOPIC,
        }
    }
}

/// The two strings sent to the provider.
#[derive(Debug, Clone)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Builds the prompt pair around an already-bounded dialogue text.
pub fn assemble(bounded_text: &str, total_turns: usize) -> PromptPair {
    let topics = TopicTarget::for_turns(total_turns);
    let user = format!(
        "Analyse the following conversation of {total_turns} messages in total and split it into its main discussion topics.\n\n\
{bounded_text}\n\n\
Instructions:\n\
1. Number of topics: produce between {min} and {max} topic nodes, ideally {target}.\n\
2. Minimum topic size: every topic node must contain at least {min_turns} messages.\n\
3. Follow the JSON format strictly and honour the full-coverage requirement from the system instructions: every message must be assigned.",
        min = topics.min,
        target = topics.target,
        max = topics.max,
        min_turns = topics.min_turns_per_topic,
    );
    PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
