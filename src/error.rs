//! Runtime error taxonomy
//!
//! Only engine protocol failures are fatal to a run and surface here.
//! Asset and audio failures are logged where they happen and degrade that
//! one element; persistence failures are reported as booleans by the save
//! coordinator. None of those three ever reach [`RuntimeError`].

use crate::assets::AssetError;
use crate::engine::EngineError;
use crate::node::NodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("engine protocol error: {0}")]
    Engine(#[from] EngineError),

    /// The engine produced a node violating the shape invariants, which
    /// means the script is malformed.
    #[error("malformed node from engine: {0}")]
    Node(#[from] NodeError),

    /// The engine reported no current node mid-run.
    #[error("engine has no current node")]
    NoCurrentNode,

    /// The startup script could not be fetched; fatal, unlike per-node
    /// asset failures.
    #[error("failed to load script: {0}")]
    ScriptFetch(#[from] AssetError),

    #[error("script asset at '{0}' is not JSON")]
    ScriptNotJson(String),

    #[error("playback loop is already running")]
    AlreadyRunning,
}
