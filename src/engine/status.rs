// Status store: per-resource lifecycle phase plus the shared result slot of an
// in-flight load.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::LoadError;

/// Result handed to every waiter of a load.
pub type Outcome = Result<(), LoadError>;

/// Receiving end of the result slot shared by all waiters of one load.
pub type OutcomeSlot = watch::Receiver<Option<Outcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Unrequested,
    Loading,
    Ready,
    Failed,
}

/// Immutable view of every known resource's phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Incremented on every transition.
    pub revision: u64,
    pub phases: BTreeMap<String, LoadPhase>,
}

impl StatusSnapshot {
    pub fn phase(&self, id: &str) -> LoadPhase {
        self.phases
            .get(id)
            .copied()
            .unwrap_or(LoadPhase::Unrequested)
    }

    pub fn is_ready(&self, id: &str) -> bool {
        self.phase(id) == LoadPhase::Ready
    }

    pub fn count(&self, phase: LoadPhase) -> usize {
        self.phases.values().filter(|p| **p == phase).count()
    }
}

struct ResourceState {
    phase: LoadPhase,
    attempts: u32,
    last_error: Option<LoadError>,
    inflight: Option<OutcomeSlot>,
}

pub struct StatusStore {
    states: HashMap<String, ResourceState>,
    snapshot: Arc<StatusSnapshot>,
}

impl StatusStore {
    /// Create a store that reports `known_ids` as unrequested.
    pub fn new<'a>(known_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let phases = known_ids
            .into_iter()
            .map(|id| (id.to_string(), LoadPhase::Unrequested))
            .collect();
        Self {
            states: HashMap::new(),
            snapshot: Arc::new(StatusSnapshot {
                revision: 0,
                phases,
            }),
        }
    }

    pub fn phase(&self, id: &str) -> LoadPhase {
        self.states
            .get(id)
            .map(|s| s.phase)
            .unwrap_or(LoadPhase::Unrequested)
    }

    /// The in-flight result slot, if `id` is loading.
    pub fn join(&self, id: &str) -> Option<OutcomeSlot> {
        self.states
            .get(id)
            .filter(|s| s.phase == LoadPhase::Loading)
            .and_then(|s| s.inflight.clone())
    }

    /// Enter `Loading` with a fresh result slot.
    pub fn begin(&mut self, id: &str, slot: OutcomeSlot) -> Arc<StatusSnapshot> {
        let state = self
            .states
            .entry(id.to_string())
            .or_insert_with(|| ResourceState {
                phase: LoadPhase::Unrequested,
                attempts: 0,
                last_error: None,
                inflight: None,
            });
        state.phase = LoadPhase::Loading;
        state.attempts += 1;
        state.inflight = Some(slot);
        self.publish(id, LoadPhase::Loading)
    }

    /// Leave `Loading` with the final outcome.
    pub fn finish(&mut self, id: &str, outcome: &Outcome) -> Arc<StatusSnapshot> {
        let phase = if outcome.is_ok() {
            LoadPhase::Ready
        } else {
            LoadPhase::Failed
        };
        if let Some(state) = self.states.get_mut(id) {
            state.phase = phase;
            state.inflight = None;
            state.last_error = outcome.as_ref().err().cloned();
        }
        self.publish(id, phase)
    }

    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn attempts(&self, id: &str) -> u32 {
        self.states.get(id).map(|s| s.attempts).unwrap_or(0)
    }

    pub fn last_error(&self, id: &str) -> Option<LoadError> {
        self.states.get(id).and_then(|s| s.last_error.clone())
    }

    fn publish(&mut self, id: &str, phase: LoadPhase) -> Arc<StatusSnapshot> {
        let mut phases = self.snapshot.phases.clone();
        phases.insert(id.to_string(), phase);
        self.snapshot = Arc::new(StatusSnapshot {
            revision: self.snapshot.revision + 1,
            phases,
        });
        Arc::clone(&self.snapshot)
    }
}
