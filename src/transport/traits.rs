use anyhow::Result;
use async_trait::async_trait;

use crate::registry::descriptor::ResourceKind;

/// One-shot fetch-and-inject operations.
///
/// Calling either method twice for the same location fetches twice;
/// deduplication belongs to the loader.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch and evaluate a script. Resolves once its load or error signal fires.
    async fn inject_executable(&self, location: &str) -> Result<()>;

    /// Fetch and attach a stylesheet. Resolves once its load or error signal fires.
    async fn inject_stylesheet(&self, location: &str) -> Result<()>;

    async fn inject(&self, kind: ResourceKind, location: &str) -> Result<()> {
        match kind {
            ResourceKind::Executable => self.inject_executable(location).await,
            ResourceKind::Stylesheet => self.inject_stylesheet(location).await,
        }
    }
}
