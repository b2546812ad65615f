use tracing::{info, warn};

use super::coordinator::ResourceLoader;
use crate::error::LoadError;

#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, LoadError)>,
}

/// Request every id up front, then wait for all of them.
///
/// Failures are collected rather than propagated; preloading is best-effort
/// and consumers still call `ensure_loaded` before use.
pub async fn run_preload<S: AsRef<str>>(loader: &ResourceLoader, ids: &[S]) -> PreloadReport {
    let mut report = PreloadReport::default();
    let mut tickets = Vec::with_capacity(ids.len());

    for id in ids {
        match loader.request(id.as_ref()) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => {
                warn!("preload skipped {}: {}", id.as_ref(), e);
                report.failed.push((id.as_ref().to_string(), e));
            }
        }
    }

    for ticket in tickets {
        let id = ticket.id().to_string();
        match ticket.wait().await {
            Ok(()) => report.loaded.push(id),
            Err(e) => report.failed.push((id, e)),
        }
    }

    info!(
        "preload finished loaded={} failed={}",
        report.loaded.len(),
        report.failed.len()
    );
    report
}
