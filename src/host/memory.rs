// Headless document: records attached nodes and defines configured globals
// when a script is evaluated.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::debug;

use super::traits::{Document, NodeId, ScriptHost};
use crate::registry::descriptor::ResourceKind;

#[derive(Debug, Clone)]
pub struct AttachedNode {
    pub location: String,
    pub kind: ResourceKind,
    pub len: usize,
}

#[derive(Default)]
pub struct MemoryDocument {
    next_node: AtomicU64,
    nodes: Mutex<BTreeMap<NodeId, AttachedNode>>,
    globals: RwLock<HashSet<String>>,
    exports: RwLock<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<(String, Value)>>,
    evaluated: Mutex<Vec<String>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Globals defined when the script at `location` is evaluated.
    pub fn with_exports(self, location: &str, symbols: &[&str]) -> Self {
        self.set_exports(location, symbols);
        self
    }

    pub fn set_exports(&self, location: &str, symbols: &[&str]) {
        self.exports.write().insert(
            location.to_string(),
            symbols.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn define_global(&self, name: &str) {
        self.globals.write().insert(name.to_string());
    }

    /// Nodes still attached, in attach order.
    pub fn attached(&self) -> Vec<AttachedNode> {
        self.nodes.lock().values().cloned().collect()
    }

    /// Every script location evaluated so far, including detached ones.
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.evaluated.lock().clone()
    }

    pub fn global_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    fn attach(&self, location: &str, kind: ResourceKind, len: usize) -> NodeId {
        let id = self.next_node.fetch_add(1, Ordering::Relaxed);
        self.nodes.lock().insert(
            id,
            AttachedNode {
                location: location.to_string(),
                kind,
                len,
            },
        );
        id
    }
}

impl ScriptHost for MemoryDocument {
    fn has_global(&self, name: &str) -> bool {
        self.globals.read().contains(name)
    }

    fn call_global(&self, function: &str, args: Value) -> Result<()> {
        let root = function.split('.').next().unwrap_or(function);
        if !self.has_global(root) {
            return Err(anyhow!("{} is not defined", root));
        }
        self.calls.lock().push((function.to_string(), args));
        Ok(())
    }
}

impl Document for MemoryDocument {
    fn attach_script(&self, location: &str, body: &[u8]) -> Result<NodeId> {
        if body.is_empty() {
            return Err(anyhow!("empty script body from {}", location));
        }
        let id = self.attach(location, ResourceKind::Executable, body.len());
        self.evaluated.lock().push(location.to_string());

        if let Some(symbols) = self.exports.read().get(location) {
            let mut globals = self.globals.write();
            for symbol in symbols {
                globals.insert(symbol.clone());
            }
        }
        debug!("script evaluated location={} bytes={}", location, body.len());
        Ok(id)
    }

    fn attach_stylesheet(&self, location: &str, body: &[u8]) -> Result<NodeId> {
        Ok(self.attach(location, ResourceKind::Stylesheet, body.len()))
    }

    fn detach(&self, node: NodeId) {
        self.nodes.lock().remove(&node);
    }
}
