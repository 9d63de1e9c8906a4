//! Verification Dispatcher — decides which traces need a hallucination
//! check and keeps at most one check per trace id outstanding.
//!
//! Per-id lifecycle: `untracked -> InFlight -> CoolingDown -> untracked`.
//!
//! An id is claimed synchronously, before the check request is spawned, so
//! two overlapping `consider_batch` calls can never both dispatch it. After
//! the check completes (either way) the id stays claimed for a cool-down
//! window; this keeps the next poll tick from re-checking a trace whose
//! verdict has not reached the store yet, and rate-limits retries against a
//! failing backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lighthouse_core::config::VerificationConfig;
use lighthouse_core::{ConnectionId, Trace, TraceBackend, TraceId, TracePatch};
use tokio::sync::watch;

use crate::connections::ConnectionRegistry;
use crate::store::TraceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    InFlight,
    CoolingDown,
}

/// What surfaced the trace. Selects the cool-down window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTrigger {
    Poll,
    Submission,
}

pub type CheckRegistry = HashMap<TraceId, CheckState>;

pub struct VerificationDispatcher {
    backend: Arc<dyn TraceBackend>,
    store: Arc<TraceStore>,
    connections: Arc<ConnectionRegistry>,
    config: VerificationConfig,
    registry: Arc<watch::Sender<CheckRegistry>>,
}

impl VerificationDispatcher {
    pub fn new(
        backend: Arc<dyn TraceBackend>,
        store: Arc<TraceStore>,
        connections: Arc<ConnectionRegistry>,
        config: VerificationConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(CheckRegistry::new());
        Self {
            backend,
            store,
            connections,
            config,
            registry: Arc::new(tx),
        }
    }

    /// Dispatch a check for every trace in `traces` that still needs one.
    ///
    /// Safe to call from every poll tick and every submission without
    /// coordination. Returns the ids dispatched by this call.
    pub fn consider_batch<'a>(
        &self,
        traces: impl IntoIterator<Item = &'a Trace>,
        trigger: CheckTrigger,
    ) -> Vec<TraceId> {
        let Some(connection) = self.connections.primary() else {
            tracing::debug!("No connected database available for hallucination detection");
            return Vec::new();
        };

        let mut dispatched = Vec::new();
        for trace in traces {
            if !trace.is_pending_verification() {
                continue;
            }
            if !self.try_claim(&trace.id) {
                continue;
            }
            self.spawn_check(trace.id.clone(), connection.id.clone(), trigger);
            dispatched.push(trace.id.clone());
        }

        if !dispatched.is_empty() {
            tracing::debug!(
                count = dispatched.len(),
                connection_id = %connection.id,
                ?trigger,
                "Dispatched hallucination checks"
            );
        }
        dispatched
    }

    pub fn state(&self, id: &TraceId) -> Option<CheckState> {
        self.registry.borrow().get(id).copied()
    }

    /// Ids currently in flight or cooling down.
    pub fn checking(&self) -> Vec<TraceId> {
        let mut ids: Vec<TraceId> = self.registry.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn in_flight(&self) -> usize {
        self.registry
            .borrow()
            .values()
            .filter(|s| **s == CheckState::InFlight)
            .count()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckRegistry> {
        self.registry.subscribe()
    }

    fn cooldown(&self, trigger: CheckTrigger) -> Duration {
        match trigger {
            CheckTrigger::Poll => self.config.poll_cooldown(),
            CheckTrigger::Submission => self.config.submission_cooldown(),
        }
    }

    fn try_claim(&self, id: &TraceId) -> bool {
        self.registry.send_if_modified(|registry| {
            if registry.contains_key(id) {
                return false;
            }
            registry.insert(id.clone(), CheckState::InFlight);
            true
        })
    }

    fn spawn_check(&self, trace_id: TraceId, connection_id: ConnectionId, trigger: CheckTrigger) {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let cooldown = self.cooldown(trigger);

        tokio::spawn(async move {
            tracing::debug!(trace_id = %trace_id, connection_id = %connection_id, "Checking hallucinations");

            match backend.check_hallucinations(&trace_id, &connection_id).await {
                Ok(checked) => {
                    let patch = TracePatch::verdict_of(&checked);
                    if patch.is_empty() {
                        tracing::warn!(trace_id = %trace_id, "Hallucination check returned no verdict");
                    } else {
                        store.patch(&trace_id, &patch);
                        tracing::info!(
                            trace_id = %trace_id,
                            confidence = ?checked.confidence_score,
                            "Hallucination check completed"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(trace_id = %trace_id, error = %e, "Hallucination check failed");
                }
            }

            registry.send_modify(|r| {
                r.insert(trace_id.clone(), CheckState::CoolingDown);
            });

            tokio::time::sleep(cooldown).await;

            registry.send_modify(|r| {
                r.remove(&trace_id);
            });
        });
    }
}
