// Loader counters: requests, coalesced joins, fetches and failures.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStatsSnapshot {
    pub requests: u64,
    /// Requests answered from an already `ready` resource.
    pub ready_hits: u64,
    /// Requests that joined a load already in flight.
    pub coalesced: u64,
    pub loads_started: u64,
    /// Individual transport calls, one per location attempted.
    pub fetches: u64,
    pub loads_failed: u64,
    pub dependency_failures: u64,
}

#[derive(Default)]
pub struct LoaderStats {
    requests: AtomicU64,
    ready_hits: AtomicU64,
    coalesced: AtomicU64,
    loads_started: AtomicU64,
    fetches: AtomicU64,
    loads_failed: AtomicU64,
    dependency_failures: AtomicU64,
}

impl LoaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ready_hit(&self) {
        self.ready_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_started(&self) {
        self.loads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dependency_failure(&self) {
        self.dependency_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            ready_hits: self.ready_hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            loads_started: self.loads_started.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            loads_failed: self.loads_failed.load(Ordering::Relaxed),
            dependency_failures: self.dependency_failures.load(Ordering::Relaxed),
        }
    }
}
