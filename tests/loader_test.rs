// Integration tests for the load coordinator against a scripted transport.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use resource_loader_engine::engine::coordinator::ResourceLoader;
use resource_loader_engine::engine::preload::run_preload;
use resource_loader_engine::engine::status::{LoadPhase, StatusSnapshot};
use resource_loader_engine::error::LoadError;
use resource_loader_engine::host::memory::MemoryDocument;
use resource_loader_engine::host::traits::Document;
use resource_loader_engine::registry::descriptor::ResourceDescriptor;
use resource_loader_engine::registry::Registry;
use resource_loader_engine::transport::traits::Transport;

/// Transport that records every call, blocks on a gate, and fails on demand.
struct MockTransport {
    doc: Arc<MemoryDocument>,
    gate: Semaphore,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn open(doc: Arc<MemoryDocument>) -> Arc<Self> {
        Self::with_permits(doc, Semaphore::MAX_PERMITS)
    }

    fn gated(doc: Arc<MemoryDocument>) -> Arc<Self> {
        Self::with_permits(doc, 0)
    }

    fn with_permits(doc: Arc<MemoryDocument>, permits: usize) -> Arc<Self> {
        Arc::new(Self {
            doc,
            gate: Semaphore::new(permits),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn release(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }

    fn fail(&self, location: &str) {
        self.failing.lock().insert(location.to_string());
    }

    fn heal(&self, location: &str) {
        self.failing.lock().remove(location);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn calls_for(&self, location: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == location).count()
    }

    async fn pass_gate(&self, location: &str) -> Result<()> {
        self.calls.lock().push(location.to_string());
        self.gate.acquire().await?.forget();
        if self.failing.lock().contains(location) {
            return Err(anyhow!("network unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn inject_executable(&self, location: &str) -> Result<()> {
        self.pass_gate(location).await?;
        let node = self.doc.attach_script(location, b"/* mock */")?;
        self.doc.detach(node);
        Ok(())
    }

    async fn inject_stylesheet(&self, location: &str) -> Result<()> {
        self.pass_gate(location).await?;
        self.doc.attach_stylesheet(location, b"/* mock */")?;
        Ok(())
    }
}

fn test_registry() -> Registry {
    Registry::new([
        ResourceDescriptor::executable("a", "A").with_location("a.js"),
        ResourceDescriptor::executable("b", "B")
            .with_location("b.js")
            .with_dependency("c"),
        ResourceDescriptor::stylesheet("c").with_location("c.css"),
        ResourceDescriptor::executable("d", "D").with_location("d.js"),
        ResourceDescriptor::executable("multi", "M")
            .with_location("m1.js")
            .with_location("m2.js")
            .with_location("m3.js"),
        ResourceDescriptor::executable("hooked", "H")
            .with_location("h.js")
            .with_post_load(|_| Err(anyhow!("initialize threw"))),
        ResourceDescriptor::executable("configured", "G")
            .with_location("g.js")
            .with_post_load(|host| {
                host.call_global("G.configure", serde_json::json!({ "theme": "dark" }))
            }),
        ResourceDescriptor::executable("ext", "E")
            .with_location("ext.js")
            .sharing_symbol_with("a"),
    ])
    .unwrap()
}

fn document() -> Arc<MemoryDocument> {
    Arc::new(
        MemoryDocument::new()
            .with_exports("a.js", &["A"])
            .with_exports("b.js", &["B"])
            .with_exports("m3.js", &["M"])
            .with_exports("h.js", &["H"])
            .with_exports("g.js", &["G"]),
    )
}

fn setup(transport: fn(Arc<MemoryDocument>) -> Arc<MockTransport>) -> (ResourceLoader, Arc<MockTransport>) {
    let doc = document();
    let transport = transport(doc.clone());
    let loader = ResourceLoader::new(test_registry(), transport.clone(), doc);
    (loader, transport)
}

#[tokio::test]
async fn test_concurrent_requests_coalesce() {
    let (loader, transport) = setup(MockTransport::gated);

    let first = loader.request("a").unwrap();
    let second = loader.request("a").unwrap();
    assert_eq!(loader.phase("a"), LoadPhase::Loading);

    transport.release(1);
    let (r1, r2) = tokio::join!(first.wait(), second.wait());

    assert_eq!(r1, Ok(()));
    assert_eq!(r1, r2);
    assert_eq!(transport.calls_for("a.js"), 1);
    assert_eq!(loader.current_status().phase("a"), LoadPhase::Ready);

    let stats = loader.stats();
    assert_eq!(stats.loads_started, 1);
    assert_eq!(stats.coalesced, 1);
}

#[tokio::test]
async fn test_many_concurrent_callers_single_fetch() {
    let (loader, transport) = setup(MockTransport::gated);

    let waiters: Vec<_> = (0..16)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.ensure_loaded("multi").await })
        })
        .collect();

    tokio::task::yield_now().await;
    transport.release(3);

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }
    assert_eq!(transport.calls(), vec!["m1.js", "m2.js", "m3.js"]);
    assert_eq!(loader.stats().loads_started, 1);
}

#[tokio::test]
async fn test_ready_resource_is_not_refetched() {
    let (loader, transport) = setup(MockTransport::open);

    loader.ensure_loaded("a").await.unwrap();
    loader.ensure_loaded("a").await.unwrap();
    loader.ensure_loaded("a").await.unwrap();

    assert_eq!(transport.calls_for("a.js"), 1);
    assert_eq!(loader.attempts("a"), 1);
    assert_eq!(loader.stats().ready_hits, 2);
}

#[tokio::test]
async fn test_failed_resource_can_be_retried() {
    let (loader, transport) = setup(MockTransport::open);
    transport.fail("a.js");

    let err = loader.ensure_loaded("a").await.unwrap_err();
    assert!(matches!(err, LoadError::FetchFailed { ref location, .. } if location == "a.js"));
    assert_eq!(loader.phase("a"), LoadPhase::Failed);

    transport.heal("a.js");
    loader.ensure_loaded("a").await.unwrap();

    assert_eq!(loader.phase("a"), LoadPhase::Ready);
    assert_eq!(transport.calls_for("a.js"), 2);
    assert_eq!(loader.attempts("a"), 2);
    assert_eq!(loader.last_error("a"), None);
}

#[tokio::test]
async fn test_missing_symbol_fails_load() {
    let (loader, transport) = setup(MockTransport::open);

    let err = loader.ensure_loaded("d").await.unwrap_err();
    assert_eq!(
        err,
        LoadError::SymbolNotFound {
            resource: "d".into(),
            symbol: "D".into(),
        }
    );
    assert_eq!(transport.calls_for("d.js"), 1);
    assert_eq!(loader.phase("d"), LoadPhase::Failed);
}

#[tokio::test]
async fn test_dependency_failure_is_soft() {
    let (loader, transport) = setup(MockTransport::open);
    transport.fail("c.css");

    loader.ensure_loaded("b").await.unwrap();

    assert_eq!(loader.phase("b"), LoadPhase::Ready);
    assert_eq!(loader.phase("c"), LoadPhase::Failed);
    assert_eq!(transport.calls(), vec!["c.css", "b.js"]);
    assert_eq!(loader.stats().dependency_failures, 1);
}

#[tokio::test]
async fn test_dependency_loads_before_dependent() {
    let (loader, transport) = setup(MockTransport::open);

    loader.ensure_loaded("b").await.unwrap();

    assert_eq!(transport.calls(), vec!["c.css", "b.js"]);
    assert_eq!(loader.phase("c"), LoadPhase::Ready);
}

#[tokio::test]
async fn test_location_failure_aborts_remaining() {
    let (loader, transport) = setup(MockTransport::open);
    transport.fail("m2.js");

    let err = loader.ensure_loaded("multi").await.unwrap_err();
    assert!(matches!(err, LoadError::FetchFailed { ref location, .. } if location == "m2.js"));
    assert_eq!(transport.calls(), vec!["m1.js", "m2.js"]);
}

#[tokio::test]
async fn test_hook_failure_keeps_ready() {
    let (loader, _transport) = setup(MockTransport::open);
    loader.ensure_loaded("hooked").await.unwrap();
    assert_eq!(loader.phase("hooked"), LoadPhase::Ready);
}

#[tokio::test]
async fn test_hook_runs_after_load() {
    let doc = document();
    let transport = MockTransport::open(doc.clone());
    let loader = ResourceLoader::new(test_registry(), transport, doc.clone());

    loader.ensure_loaded("configured").await.unwrap();

    let calls = doc.global_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "G.configure");
    assert_eq!(calls[0].1["theme"], "dark");
}

#[tokio::test]
async fn test_shared_symbol_resource_skips_validation() {
    let (loader, _transport) = setup(MockTransport::open);
    loader.ensure_loaded("ext").await.unwrap();
    assert_eq!(loader.phase("ext"), LoadPhase::Ready);
}

#[tokio::test]
async fn test_unknown_resource_rejects_immediately() {
    let (loader, transport) = setup(MockTransport::open);
    let err = loader.ensure_loaded("nope").await.unwrap_err();
    assert_eq!(err, LoadError::UnknownResource("nope".into()));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_initial_snapshot_lists_every_resource() {
    let (loader, _transport) = setup(MockTransport::open);
    let snapshot = loader.current_status();
    assert_eq!(snapshot.revision, 0);
    assert_eq!(snapshot.phases.len(), test_registry().len());
    assert_eq!(snapshot.count(LoadPhase::Unrequested), snapshot.phases.len());
}

#[tokio::test]
async fn test_subscribers_see_transitions_in_order() {
    let (loader, _transport) = setup(MockTransport::open);
    let seen: Arc<Mutex<Vec<(u64, LoadPhase)>>> = Arc::new(Mutex::new(Vec::new()));

    let s = seen.clone();
    loader.subscribe(move |snap: &StatusSnapshot| s.lock().push((snap.revision, snap.phase("a"))));

    loader.ensure_loaded("a").await.unwrap();

    assert_eq!(
        *seen.lock(),
        vec![(1, LoadPhase::Loading), (2, LoadPhase::Ready)]
    );
}

#[tokio::test]
async fn test_unsubscribed_callback_receives_nothing() {
    let (loader, _transport) = setup(MockTransport::open);
    let hits = Arc::new(Mutex::new(0u32));

    let h = hits.clone();
    let id = loader.subscribe(move |_| *h.lock() += 1);
    assert!(loader.unsubscribe(id));

    loader.ensure_loaded("a").await.unwrap();
    assert_eq!(*hits.lock(), 0);
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_block_others() {
    let (loader, _transport) = setup(MockTransport::open);
    let last: Arc<Mutex<Option<LoadPhase>>> = Arc::new(Mutex::new(None));

    loader.subscribe(|_| panic!("subscriber bug"));
    let l = last.clone();
    loader.subscribe(move |snap| *l.lock() = Some(snap.phase("a")));

    loader.ensure_loaded("a").await.unwrap();
    assert_eq!(*last.lock(), Some(LoadPhase::Ready));
}

#[tokio::test]
async fn test_subscriber_may_request_from_callback() {
    let (loader, transport) = setup(MockTransport::open);

    let chained = loader.clone();
    loader.subscribe(move |snap| {
        if snap.is_ready("a") && snap.phase("b") == LoadPhase::Unrequested {
            chained.request("b").unwrap();
        }
    });

    loader.ensure_loaded("a").await.unwrap();
    loader.ensure_loaded("b").await.unwrap();

    assert_eq!(loader.attempts("b"), 1);
    assert_eq!(transport.calls_for("b.js"), 1);
}

#[tokio::test]
async fn test_ensure_all_reports_first_failure() {
    let (loader, _transport) = setup(MockTransport::open);

    loader.ensure_all(&["a", "c"]).await.unwrap();

    let err = loader.ensure_all(&["a", "d", "b"]).await.unwrap_err();
    assert!(matches!(err, LoadError::SymbolNotFound { .. }));
    assert_eq!(loader.phase("b"), LoadPhase::Ready);

    let err = loader.ensure_all(&["a", "missing"]).await.unwrap_err();
    assert_eq!(err, LoadError::UnknownResource("missing".into()));
}

#[tokio::test]
async fn test_preload_reports_each_resource() {
    let (loader, _transport) = setup(MockTransport::open);

    let report = run_preload(&loader, &["a", "nope", "d"]).await;

    assert_eq!(report.loaded, vec!["a".to_string()]);
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["nope", "d"]);
    assert!(matches!(report.failed[0].1, LoadError::UnknownResource(_)));
}
