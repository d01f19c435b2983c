//! Dialogue types for threadmap.
//!
//! A [`Turn`] is one already-extracted chat message with its absolute
//! position in the conversation. Dialogues are loaded from JSON, either a bare
//! array of `{role, content}` objects or an object with a `dialogue` array.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Parses a role string. Only `user` and `assistant` are valid.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the dialogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Absolute 0-based position in the dialogue.
    pub ordinal: usize,
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Turn as it appears in the input file, before validation.
#[derive(Debug, Deserialize)]
pub struct RawTurn {
    pub role: String,
    #[serde(alias = "text")]
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DialogueFile {
    Wrapped { dialogue: Vec<RawTurn> },
    Bare(Vec<RawTurn>),
}

/// Validates raw turns and assigns ordinals.
///
/// Turns with an unknown role or blank text are skipped, so ordinals stay
/// dense over the accepted turns.
pub fn from_raw(raw: Vec<RawTurn>) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(raw.len());
    for (position, item) in raw.into_iter().enumerate() {
        let Some(role) = Role::parse(&item.role) else {
            warn!(position, role = %item.role, "skipping turn with unknown role");
            continue;
        };
        if item.content.trim().is_empty() {
            debug!(position, "skipping empty turn");
            continue;
        }
        turns.push(Turn {
            ordinal: turns.len(),
            role,
            text: item.content,
        });
    }
    turns
}

/// Parses a dialogue from a JSON string.
pub fn parse(json: &str) -> Result<Vec<Turn>> {
    let file: DialogueFile = serde_json::from_str(json)
        .context("Dialogue must be a JSON array of turns or {\"dialogue\": [...]}")?;
    let raw = match file {
        DialogueFile::Wrapped { dialogue } => dialogue,
        DialogueFile::Bare(turns) => turns,
    };
    Ok(from_raw(raw))
}

/// Loads a dialogue from a file path, or from stdin when the path is `-`.
pub fn load(path: &Path) -> Result<Vec<Turn>> {
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read dialogue from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read dialogue from {:?}", path))?
    };
    parse(&contents)
}

#[cfg(test)]
pub(crate) fn turns(specs: &[(Role, &str)]) -> Vec<Turn> {
    specs
        .iter()
        .enumerate()
        .map(|(ordinal, (role, text))| Turn {
            ordinal,
            role: *role,
            text: text.to_string(),
        })
        .collect()
}
