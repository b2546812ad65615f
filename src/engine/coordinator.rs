// Load coordinator: coalesces requests, resolves the dependency, runs the
// fetch sequence and validates the expected symbol.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::bus::{NotificationBus, SubscriptionId};
use super::stats::{LoaderStats, LoaderStatsSnapshot};
use super::status::{LoadPhase, Outcome, OutcomeSlot, StatusSnapshot, StatusStore};
use crate::error::LoadError;
use crate::host::traits::ScriptHost;
use crate::registry::descriptor::ResourceDescriptor;
use crate::registry::Registry;
use crate::transport::traits::Transport;

/// Process-wide resource loader. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader").finish_non_exhaustive()
    }
}

struct LoaderInner {
    registry: Registry,
    transport: Arc<dyn Transport>,
    host: Arc<dyn ScriptHost>,
    store: Mutex<StatusStore>,
    bus: NotificationBus,
    stats: LoaderStats,
}

/// Handle on the outcome of one [`ResourceLoader::request`].
pub struct LoadTicket {
    id: String,
    state: TicketState,
}

enum TicketState {
    Resolved(Outcome),
    Pending(OutcomeSlot),
}

impl LoadTicket {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the outcome was known when the ticket was issued.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, TicketState::Resolved(_))
    }

    /// Suspend until the load this ticket is joined to has finished.
    pub async fn wait(self) -> Outcome {
        match self.state {
            TicketState::Resolved(outcome) => outcome,
            TicketState::Pending(mut slot) => {
                let outcome = match slot.wait_for(Option::is_some).await {
                    Ok(value) => (*value).clone(),
                    Err(_) => None,
                };
                outcome.unwrap_or(Err(LoadError::Abandoned(self.id)))
            }
        }
    }
}

enum Step {
    Ready,
    Join(OutcomeSlot),
    Start(watch::Sender<Option<Outcome>>, OutcomeSlot),
}

impl ResourceLoader {
    pub fn new(
        registry: Registry,
        transport: Arc<dyn Transport>,
        host: Arc<dyn ScriptHost>,
    ) -> Self {
        let store = StatusStore::new(registry.ids());
        info!("resource loader initialized with {} resources", registry.len());
        Self {
            inner: Arc::new(LoaderInner {
                registry,
                transport,
                host,
                store: Mutex::new(store),
                bus: NotificationBus::new(),
                stats: LoaderStats::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Request `id` without waiting.
    ///
    /// Fails synchronously for an unregistered id, or with
    /// [`LoadError::NoRuntime`] outside a Tokio runtime. A `ready` resource
    /// yields a resolved ticket; a `loading` one yields a ticket joined to the
    /// in-flight load; otherwise a new load is spawned.
    pub fn request(&self, id: &str) -> Result<LoadTicket, LoadError> {
        let descriptor = self.inner.registry.descriptor_for(id)?;
        let runtime =
            Handle::try_current().map_err(|_| LoadError::NoRuntime(id.to_string()))?;
        self.inner.stats.record_request();

        let step = self.inner.bus.publish_with(|| {
            let mut store = self.inner.store.lock();
            if store.phase(id) == LoadPhase::Ready {
                return (Step::Ready, None);
            }
            if let Some(slot) = store.join(id) {
                return (Step::Join(slot), None);
            }
            let (tx, rx) = watch::channel(None);
            let snapshot = store.begin(id, rx.clone());
            (Step::Start(tx, rx), Some(snapshot))
        });

        let state = match step {
            Step::Ready => {
                self.inner.stats.record_ready_hit();
                TicketState::Resolved(Ok(()))
            }
            Step::Join(slot) => {
                debug!("joining in-flight load of {}", id);
                self.inner.stats.record_coalesced();
                TicketState::Pending(slot)
            }
            Step::Start(tx, slot) => {
                self.inner.stats.record_load_started();
                let loader = self.clone();
                let descriptor = descriptor.clone();
                runtime.spawn(async move {
                    loader.run_load(descriptor, tx).await;
                });
                TicketState::Pending(slot)
            }
        };

        Ok(LoadTicket {
            id: id.to_string(),
            state,
        })
    }

    /// Ensure `id` is loaded, suspending until it is `ready` or `failed`.
    pub async fn ensure_loaded(&self, id: &str) -> Outcome {
        self.request(id)?.wait().await
    }

    /// Ensure every id is loaded. Returns the first failure in argument order.
    pub async fn ensure_all<S: AsRef<str>>(&self, ids: &[S]) -> Outcome {
        let tickets = ids
            .iter()
            .map(|id| self.request(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        join_all(tickets.into_iter().map(LoadTicket::wait))
            .await
            .into_iter()
            .collect()
    }

    pub fn current_status(&self) -> Arc<StatusSnapshot> {
        self.inner.store.lock().snapshot()
    }

    pub fn phase(&self, id: &str) -> LoadPhase {
        self.inner.store.lock().phase(id)
    }

    /// Error of the most recent attempt, if it failed.
    pub fn last_error(&self, id: &str) -> Option<LoadError> {
        self.inner.store.lock().last_error(id)
    }

    pub fn attempts(&self, id: &str) -> u32 {
        self.inner.store.lock().attempts(id)
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.inner.stats.snapshot()
    }

    async fn run_load(self, descriptor: ResourceDescriptor, tx: watch::Sender<Option<Outcome>>) {
        let mut completion = Completion {
            loader: self.clone(),
            id: descriptor.id.clone(),
            tx: Some(tx),
        };
        let outcome = self.load_sequence(&descriptor).await;
        completion.complete(outcome);
    }

    async fn load_sequence(&self, descriptor: &ResourceDescriptor) -> Outcome {
        let id = descriptor.id.as_str();

        if let Some(dependency) = &descriptor.dependency {
            debug!("{} waiting on dependency {}", id, dependency);
            if let Err(e) = self.ensure_loaded(dependency).await {
                self.inner.stats.record_dependency_failure();
                let soft = LoadError::DependencyFailed {
                    resource: id.to_string(),
                    dependency: dependency.clone(),
                    reason: e.to_string(),
                };
                warn!("{}; loading {} anyway", soft, id);
            }
        }

        for location in &descriptor.locations {
            self.inner.stats.record_fetch();
            debug!("fetching {} from {}", id, location);
            if let Err(e) = self.inner.transport.inject(descriptor.kind, location).await {
                warn!("fetch of {} failed at {}: {:#}", id, location, e);
                return Err(LoadError::FetchFailed {
                    resource: id.to_string(),
                    location: location.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }

        if let Some(hook) = &descriptor.post_load {
            match catch_unwind(AssertUnwindSafe(|| hook(self.inner.host.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("post-load hook for {} failed: {:#}", id, e),
                Err(_) => warn!("post-load hook for {} panicked", id),
            }
        }

        if let Some(symbol) = descriptor.symbol_to_validate() {
            if !self.inner.host.has_global(symbol) {
                return Err(LoadError::SymbolNotFound {
                    resource: id.to_string(),
                    symbol: symbol.to_string(),
                });
            }
        }

        Ok(())
    }

    fn finish(&self, id: &str, outcome: &Outcome) {
        match outcome {
            Ok(()) => info!("resource {} ready", id),
            Err(e) => {
                self.inner.stats.record_load_failed();
                warn!("resource {} failed: {}", id, e);
            }
        }
        self.inner.bus.publish_with(|| {
            let snapshot = self.inner.store.lock().finish(id, outcome);
            ((), Some(snapshot))
        });
    }
}

/// Finalizes a load exactly once, including when the load task unwinds.
struct Completion {
    loader: ResourceLoader,
    id: String,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl Completion {
    fn complete(&mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            self.loader.finish(&self.id, &outcome);
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let id = self.id.clone();
            self.complete(Err(LoadError::Abandoned(id)));
        }
    }
}
