use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, warn};

use super::traits::Transport;
use crate::config::LoaderConfig;
use crate::detect::payload::{accepts, detect_payload};
use crate::host::traits::Document;
use crate::registry::descriptor::ResourceKind;

/// Fetches resources over HTTP and attaches them to a [`Document`].
pub struct HttpTransport {
    client: Client,
    headers: HashMap<String, String>,
    document: Arc<dyn Document>,
}

impl HttpTransport {
    pub fn new(document: Arc<dyn Document>, headers: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            headers,
            document,
        }
    }

    /// Build from config. A timeout is only applied when `fetch_timeout_ms` is set.
    pub fn from_config(config: &LoaderConfig, document: Arc<dyn Document>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(ms) = config.fetch_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            client: builder.build()?,
            headers: config.headers.clone(),
            document,
        })
    }

    fn build_request(&self, location: &str) -> RequestBuilder {
        let mut req = self.client.get(location);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req
    }

    async fn fetch(&self, location: &str, kind: ResourceKind) -> Result<Bytes> {
        let resp = self.build_request(location).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("fetch failed status={} location={}", status.as_u16(), location);
            return Err(anyhow!("HTTP {}", status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().await?;
        let payload = detect_payload(content_type.as_deref(), &body);
        if !accepts(kind, &payload) {
            warn!(
                "rejecting payload location={} detected={:?} content_type={:?}",
                location, payload, content_type
            );
            return Err(anyhow!("unexpected {:?} payload", payload));
        }

        debug!(
            "fetched location={} bytes={} payload={:?}",
            location,
            body.len(),
            payload
        );
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn inject_executable(&self, location: &str) -> Result<()> {
        let body = self.fetch(location, ResourceKind::Executable).await?;
        let node = self.document.attach_script(location, &body)?;
        // The script's side effects are all that matter once it has run.
        self.document.detach(node);
        Ok(())
    }

    async fn inject_stylesheet(&self, location: &str) -> Result<()> {
        let body = self.fetch(location, ResourceKind::Stylesheet).await?;
        self.document.attach_stylesheet(location, &body)?;
        Ok(())
    }
}
