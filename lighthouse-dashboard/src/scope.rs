//! Project scope — the Trace Store, stats and Verification Dispatcher for
//! one active project. A project switch discards the whole scope; checks
//! still running against a discarded scope only ever touch its store.

use std::sync::Arc;

use lighthouse_core::config::VerificationConfig;
use lighthouse_core::{LighthouseError, Stats, TraceBackend};
use tokio::sync::watch;

use crate::connections::ConnectionRegistry;
use crate::dispatcher::{CheckTrigger, VerificationDispatcher};
use crate::store::TraceStore;

/// Outcome of one full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub traces: usize,
    pub dispatched: usize,
    pub stats_updated: bool,
}

pub struct ProjectScope {
    project_id: Option<String>,
    backend: Arc<dyn TraceBackend>,
    connections: Arc<ConnectionRegistry>,
    store: Arc<TraceStore>,
    stats: watch::Sender<Option<Stats>>,
    dispatcher: VerificationDispatcher,
}

impl ProjectScope {
    pub fn new(
        project_id: Option<String>,
        backend: Arc<dyn TraceBackend>,
        connections: Arc<ConnectionRegistry>,
        verification: VerificationConfig,
    ) -> Self {
        let store = Arc::new(TraceStore::new());
        let dispatcher = VerificationDispatcher::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&connections),
            verification,
        );
        let (stats, _rx) = watch::channel(None);
        Self {
            project_id,
            backend,
            connections,
            store,
            stats,
            dispatcher,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn store(&self) -> &Arc<TraceStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &VerificationDispatcher {
        &self.dispatcher
    }

    pub(crate) fn backend(&self) -> &Arc<dyn TraceBackend> {
        &self.backend
    }

    pub fn stats(&self) -> Option<Stats> {
        self.stats.borrow().clone()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<Option<Stats>> {
        self.stats.subscribe()
    }

    /// Fetch trace list and stats, replace the store, then hand the fresh
    /// batch to the dispatcher.
    ///
    /// Errors only when the trace list could not be fetched; a failed stats
    /// fetch keeps the previous stats and is logged.
    pub async fn sync_once(&self) -> Result<SyncReport, LighthouseError> {
        let project_id = self.project_id.as_deref();
        let (traces, stats) = futures::join!(
            self.backend.list_traces(project_id),
            self.backend.stats(project_id)
        );

        let mut report = SyncReport::default();
        match stats {
            Ok(stats) => {
                self.stats.send_replace(Some(stats));
                report.stats_updated = true;
            }
            Err(e) => {
                tracing::warn!(project_id = ?project_id, error = %e, "Failed to refresh stats");
            }
        }

        let traces = traces?;
        report.traces = traces.len();
        self.store.replace_all(traces);

        if self.connections.is_empty() {
            self.connections.refresh().await;
        }

        let snapshot = self.store.snapshot();
        report.dispatched = self
            .dispatcher
            .consider_batch(snapshot.iter().map(|t| t.as_ref()), CheckTrigger::Poll)
            .len();

        Ok(report)
    }

    /// Run `sync_once` on a background task, logging any failure.
    pub fn spawn_sync(self: &Arc<Self>) {
        let scope = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = scope.sync_once().await {
                tracing::warn!(project_id = ?scope.project_id(), error = %e, "Failed to refresh data");
            }
        });
    }
}
