use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use super::simple::init_tracing;
use crate::config::LoaderConfig;
use crate::engine::bus::SubscriptionId;
use crate::engine::coordinator::ResourceLoader;
use crate::engine::preload::run_preload;
use crate::engine::status::StatusSnapshot;
use crate::host::traits::{Document, ScriptHost};
use crate::registry::catalog::builtin_registry;
use crate::transport::http_transport::HttpTransport;

static LOADER: OnceLock<ResourceLoader> = OnceLock::new();

/// Build a loader over the builtin catalog, fetching over HTTP into `document`.
pub fn build_loader<D>(config: &LoaderConfig, document: Arc<D>) -> Result<ResourceLoader>
where
    D: Document + ScriptHost + 'static,
{
    let registry = builtin_registry(config)?;
    let transport = HttpTransport::from_config(config, document.clone())?;
    Ok(ResourceLoader::new(registry, Arc::new(transport), document))
}

/// Initialize the process-wide loader and start preloading `config.preload`.
///
/// Must be called once, from within a Tokio runtime.
pub fn init_loader<D>(config: LoaderConfig, document: Arc<D>) -> Result<&'static ResourceLoader>
where
    D: Document + ScriptHost + 'static,
{
    init_tracing();
    if LOADER.get().is_some() {
        warn!("init_loader called twice; keeping the first loader");
        return Err(anyhow!("resource loader already initialized"));
    }
    let built = build_loader(&config, document)?;
    if LOADER.set(built).is_err() {
        warn!("init_loader raced another initialization; keeping the first loader");
        return Err(anyhow!("resource loader already initialized"));
    }
    let loader = loader()?;

    if !config.preload.is_empty() {
        info!("preloading {} resources", config.preload.len());
        let background = loader.clone();
        tokio::spawn(async move {
            run_preload(&background, &config.preload).await;
        });
    }
    Ok(loader)
}

pub fn loader() -> Result<&'static ResourceLoader> {
    LOADER
        .get()
        .ok_or_else(|| anyhow!("resource loader not initialized"))
}

pub async fn ensure_loaded(id: &str) -> Result<()> {
    loader()?.ensure_loaded(id).await?;
    Ok(())
}

pub fn current_status() -> Result<Arc<StatusSnapshot>> {
    Ok(loader()?.current_status())
}

pub fn subscribe<F>(callback: F) -> Result<SubscriptionId>
where
    F: Fn(&StatusSnapshot) + Send + Sync + 'static,
{
    Ok(loader()?.subscribe(callback))
}

pub fn unsubscribe(id: SubscriptionId) -> Result<bool> {
    Ok(loader()?.unsubscribe(id))
}
