use anyhow::Result;
use serde_json::Value;

/// Handle to a node attached to a [`Document`].
pub type NodeId = u64;

/// Access to the runtime global namespace.
pub trait ScriptHost: Send + Sync {
    /// Symbol probe: whether `name` is currently defined as a global.
    fn has_global(&self, name: &str) -> bool;

    /// Invoke a global function such as `mermaid.initialize` with JSON arguments.
    fn call_global(&self, function: &str, args: Value) -> Result<()>;
}

/// The document that fetched resources are attached to.
pub trait Document: Send + Sync {
    /// Attach and evaluate a script. An error is the script's error signal.
    fn attach_script(&self, location: &str, body: &[u8]) -> Result<NodeId>;

    /// Attach a stylesheet. An error is the stylesheet's error signal.
    fn attach_stylesheet(&self, location: &str, body: &[u8]) -> Result<NodeId>;

    fn detach(&self, node: NodeId);
}
