use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::host::traits::ScriptHost;

/// One-time initialization run after every location of a resource has loaded.
pub type PostLoadHook = Arc<dyn Fn(&dyn ScriptHost) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Executable,
    Stylesheet,
}

/// Static description of an external resource.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub id: String,
    /// Fetched in order; every location must succeed.
    pub locations: Vec<String>,
    pub kind: ResourceKind,
    /// Global expected to exist once an executable resource has loaded.
    pub symbol: Option<String>,
    /// Prerequisite loaded first. Its failure does not block this resource.
    pub dependency: Option<String>,
    /// Counterpart that carries the symbol; exempts this resource from validation.
    pub shares_symbol_with: Option<String>,
    pub post_load: Option<PostLoadHook>,
}

impl ResourceDescriptor {
    pub fn executable(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(id.into(), ResourceKind::Executable, Some(symbol.into()))
    }

    pub fn stylesheet(id: impl Into<String>) -> Self {
        Self::new(id.into(), ResourceKind::Stylesheet, None)
    }

    fn new(id: String, kind: ResourceKind, symbol: Option<String>) -> Self {
        Self {
            id,
            locations: Vec::new(),
            kind,
            symbol,
            dependency: None,
            shares_symbol_with: None,
            post_load: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    pub fn sharing_symbol_with(mut self, counterpart: impl Into<String>) -> Self {
        self.shares_symbol_with = Some(counterpart.into());
        self
    }

    pub fn with_post_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn ScriptHost) -> Result<()> + Send + Sync + 'static,
    {
        self.post_load = Some(Arc::new(hook));
        self
    }

    /// Symbol to probe after load, if this resource is subject to validation.
    pub fn symbol_to_validate(&self) -> Option<&str> {
        if self.kind != ResourceKind::Executable || self.shares_symbol_with.is_some() {
            return None;
        }
        self.symbol.as_deref()
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("id", &self.id)
            .field("locations", &self.locations)
            .field("kind", &self.kind)
            .field("symbol", &self.symbol)
            .field("dependency", &self.dependency)
            .field("shares_symbol_with", &self.shares_symbol_with)
            .field("post_load", &self.post_load.is_some())
            .finish()
    }
}
