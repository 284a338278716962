//! Narrative node data model
//!
//! A [`Node`] is the unit of content the narrative engine hands back for the
//! current position in the script. Nodes are immutable once returned: the
//! orchestrator re-fetches after every engine transition instead of mutating.
//!
//! Field names on the wire follow the script JSON format (`type`, `next`,
//! `se`, `expression`); empty strings mean "absent / no change".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of narrative node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Spoken line; waits for user acknowledgement before advancing.
    Dialogue,
    /// Branch point; waits for the user to pick one of `choices`.
    Choice,
    /// Scene change only; applies assets and advances without waiting.
    Scene,
    /// Terminal node; playback ends here.
    End,
}

/// One selectable branch of a [`NodeType::Choice`] node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    /// Node to jump to when this choice is selected.
    #[serde(rename = "next", default)]
    pub next_node_id: String,
}

/// The current unit of narrative content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    /// Successor for non-branching nodes; empty signals a dead end.
    #[serde(rename = "next", default)]
    pub next_node_id: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub bgm: String,
    #[serde(rename = "se", default)]
    pub sound_effect: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Violation of the node shape invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("choice node '{id}' has no choices")]
    EmptyChoices { id: String },

    #[error("{kind:?} node '{id}' carries {count} choices")]
    UnexpectedChoices {
        id: String,
        kind: NodeType,
        count: usize,
    },
}

impl Node {
    /// Checks the choice/dialogue invariant: a `choice` node has at least one
    /// entry, every other kind has none. A node violating this came from a
    /// malformed script and is treated as an engine protocol error.
    pub fn validate(&self) -> Result<(), NodeError> {
        match self.kind {
            NodeType::Choice if self.choices.is_empty() => Err(NodeError::EmptyChoices {
                id: self.id.clone(),
            }),
            NodeType::Choice => Ok(()),
            kind if !self.choices.is_empty() => Err(NodeError::UnexpectedChoices {
                id: self.id.clone(),
                kind,
                count: self.choices.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Successor node id, `None` for a dead end or a branching node.
    pub fn next_node(&self) -> Option<&str> {
        non_empty(&self.next_node_id)
    }

    pub fn background(&self) -> Option<&str> {
        non_empty(&self.background)
    }

    pub fn character(&self) -> Option<&str> {
        non_empty(&self.character)
    }

    pub fn expression(&self) -> Option<&str> {
        non_empty(&self.expression)
    }

    pub fn bgm(&self) -> Option<&str> {
        non_empty(&self.bgm)
    }

    pub fn sound_effect(&self) -> Option<&str> {
        non_empty(&self.sound_effect)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
