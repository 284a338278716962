//! Narrative engine boundary
//!
//! The engine that stores the node graph, evaluates variables and resolves
//! choices is an external collaborator. The runtime only talks to it through
//! [`NarrativeEngine`], one call at a time, and re-fetches the current node
//! after every transition. [`crate::script::ScriptEngine`] is a complete
//! in-process implementation for hosts and tests without an external engine.

use crate::node::Node;
use thiserror::Error;

/// Errors crossing the engine boundary. All of these are fatal to the
/// current run, unlike asset and audio failures which degrade locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine called before init() succeeded")]
    Uninitialized,

    #[error("script rejected: {reason}")]
    InvalidScript { reason: String },

    #[error("no node with id '{id}'")]
    UnknownNode { id: String },

    #[error("choice index {index} out of range (node has {count} choices)")]
    InvalidChoice { index: usize, count: usize },

    #[error("no history to go back to")]
    NoHistory,

    #[error("state blob rejected: {reason}")]
    CorruptState { reason: String },
}

impl EngineError {
    pub fn invalid_script(reason: impl Into<String>) -> Self {
        Self::InvalidScript {
            reason: reason.into(),
        }
    }

    pub fn corrupt_state(reason: impl Into<String>) -> Self {
        Self::CorruptState {
            reason: reason.into(),
        }
    }
}

/// Request/response boundary to the narrative engine.
///
/// The engine owns the "current node" cursor. The orchestrator mutates it
/// only through `goto_node`/`select_choice`/`go_back`/`load_state`, never
/// concurrently with another pending transition; the run loop enforces this
/// by awaiting each transition before the next fetch.
pub trait NarrativeEngine: Send + Sync {
    /// One-time setup. Every other call fails with
    /// [`EngineError::Uninitialized`] until this has succeeded.
    fn init(&mut self) -> Result<(), EngineError>;

    /// Load a script (JSON node graph). Replaces any previous script and
    /// positions the cursor at the start node.
    fn load_script(&mut self, json: &str) -> Result<(), EngineError>;

    /// The node under the cursor, or `None` when there is no script, the
    /// cursor points nowhere, or the engine is uninitialized.
    fn current_node(&self) -> Option<Node>;

    /// Move the cursor to `id`, recording the previous position in history.
    fn goto_node(&mut self, id: &str) -> Result<(), EngineError>;

    /// Resolve choice `index` on the current node and follow its edge.
    fn select_choice(&mut self, index: usize) -> Result<(), EngineError>;

    fn go_back(&mut self) -> Result<(), EngineError>;

    fn can_go_back(&self) -> bool;

    fn set_variable(&mut self, name: &str, value: i32) -> Result<(), EngineError>;

    fn get_variable(&self, name: &str) -> i32;

    /// Serialize engine state to an opaque blob. The runtime never
    /// interprets its contents; it only stores and returns them.
    fn save_state(&self) -> Result<String, EngineError>;

    /// Restore state from a blob produced by `save_state`.
    fn load_state(&mut self, blob: &str) -> Result<(), EngineError>;

    /// Back to the initial script position, variables and history cleared.
    fn reset(&mut self);

    fn shutdown(&mut self);
}
