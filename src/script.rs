//! Built-in reference engine
//!
//! [`ScriptEngine`] implements the [`NarrativeEngine`] boundary over a script
//! JSON node graph held in memory. Hosts that ship their narrative data as
//! plain JSON plug this in directly; tests use it as a conformant engine.
//!
//! The state blob format is JSON `{"currentNode": ..., "variables": {...},
//! "history": [...]}` so saves interchange with engines that serialize the
//! same shape.

use crate::engine::{EngineError, NarrativeEngine};
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ScriptData {
    nodes: Vec<Node>,
}

/// An immutable narrative graph. The first node in the script file is the
/// start node.
#[derive(Debug, Clone)]
pub struct Script {
    nodes: HashMap<String, Node>,
    start: String,
}

impl Script {
    /// Parse the script JSON format: `{"nodes": [{...}, ...]}`.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let data: ScriptData =
            serde_json::from_str(json).map_err(|e| EngineError::invalid_script(e.to_string()))?;

        if data.nodes.is_empty() {
            return Err(EngineError::invalid_script("script has no nodes"));
        }

        for node in &data.nodes {
            node.validate()
                .map_err(|e| EngineError::invalid_script(e.to_string()))?;
        }

        let start = data.nodes[0].id.clone();
        let nodes = data
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();

        Ok(Self { nodes, start })
    }

    pub fn start_node_id(&self) -> &str {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Opaque-to-the-runtime engine state, serialized on save.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EngineSnapshot {
    current_node: String,
    variables: HashMap<String, i32>,
    history: Vec<String>,
}

/// In-process implementation of the engine boundary.
#[derive(Debug, Default)]
pub struct ScriptEngine {
    initialized: bool,
    script: Option<Script>,
    current: String,
    variables: HashMap<String, i32>,
    history: Vec<String>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_init(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::Uninitialized)
        }
    }

    fn move_cursor(&mut self, id: &str) -> Result<(), EngineError> {
        let script = self.script.as_ref().ok_or(EngineError::Uninitialized)?;
        if script.node(id).is_none() {
            return Err(EngineError::UnknownNode { id: id.to_string() });
        }
        if !self.current.is_empty() {
            self.history.push(self.current.clone());
        }
        self.current = id.to_string();
        Ok(())
    }
}

impl NarrativeEngine for ScriptEngine {
    fn init(&mut self) -> Result<(), EngineError> {
        self.initialized = true;
        Ok(())
    }

    fn load_script(&mut self, json: &str) -> Result<(), EngineError> {
        self.require_init()?;
        let script = Script::from_json(json)?;
        self.current = script.start_node_id().to_string();
        self.script = Some(script);
        self.variables.clear();
        self.history.clear();
        Ok(())
    }

    fn current_node(&self) -> Option<Node> {
        if !self.initialized {
            return None;
        }
        self.script.as_ref()?.node(&self.current).cloned()
    }

    fn goto_node(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_init()?;
        self.move_cursor(id)
    }

    fn select_choice(&mut self, index: usize) -> Result<(), EngineError> {
        self.require_init()?;
        let node = self
            .current_node()
            .ok_or_else(|| EngineError::UnknownNode {
                id: self.current.clone(),
            })?;

        let choice = node
            .choices
            .get(index)
            .ok_or(EngineError::InvalidChoice {
                index,
                count: node.choices.len(),
            })?;
        let next = choice.next_node_id.clone();
        self.move_cursor(&next)
    }

    fn go_back(&mut self) -> Result<(), EngineError> {
        self.require_init()?;
        let previous = self.history.pop().ok_or(EngineError::NoHistory)?;
        self.current = previous;
        Ok(())
    }

    fn can_go_back(&self) -> bool {
        self.initialized && !self.history.is_empty()
    }

    fn set_variable(&mut self, name: &str, value: i32) -> Result<(), EngineError> {
        self.require_init()?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    fn get_variable(&self, name: &str) -> i32 {
        self.variables.get(name).copied().unwrap_or(0)
    }

    fn save_state(&self) -> Result<String, EngineError> {
        self.require_init()?;
        let snapshot = EngineSnapshot {
            current_node: self.current.clone(),
            variables: self.variables.clone(),
            history: self.history.clone(),
        };
        serde_json::to_string(&snapshot).map_err(|e| EngineError::corrupt_state(e.to_string()))
    }

    fn load_state(&mut self, blob: &str) -> Result<(), EngineError> {
        self.require_init()?;
        let snapshot: EngineSnapshot =
            serde_json::from_str(blob).map_err(|e| EngineError::corrupt_state(e.to_string()))?;

        if let Some(script) = &self.script {
            if script.node(&snapshot.current_node).is_none() {
                return Err(EngineError::UnknownNode {
                    id: snapshot.current_node,
                });
            }
        }

        self.current = snapshot.current_node;
        self.variables = snapshot.variables;
        self.history = snapshot.history;
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(script) = &self.script {
            self.current = script.start_node_id().to_string();
        } else {
            self.current.clear();
        }
        self.variables.clear();
        self.history.clear();
    }

    fn shutdown(&mut self) {
        self.script = None;
        self.current.clear();
        self.variables.clear();
        self.history.clear();
        self.initialized = false;
    }
}
