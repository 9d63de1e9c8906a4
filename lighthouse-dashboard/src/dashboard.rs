//! `Dashboard` — owns the Connection Registry and exactly one active
//! project scope with its poll loop.

use std::sync::Arc;
use std::time::Duration;

use lighthouse_core::config::VerificationConfig;
use lighthouse_core::{ConnectionId, LighthouseConfig, LighthouseError, Trace, TraceBackend};
use parking_lot::Mutex;

use crate::connections::ConnectionRegistry;
use crate::scheduler::{self, SyncHandle};
use crate::scope::ProjectScope;

struct ActiveScope {
    scope: Arc<ProjectScope>,
    handle: SyncHandle,
}

pub struct Dashboard {
    backend: Arc<dyn TraceBackend>,
    connections: Arc<ConnectionRegistry>,
    sync_interval: Duration,
    verification: VerificationConfig,
    active: Mutex<Option<ActiveScope>>,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn TraceBackend>, config: &LighthouseConfig) -> Self {
        Self {
            connections: Arc::new(ConnectionRegistry::new(Arc::clone(&backend))),
            backend,
            sync_interval: config.sync.interval(),
            verification: config.verification.clone(),
            active: Mutex::new(None),
        }
    }

    /// Override the poll period (sub-second periods are only useful in tests).
    pub fn with_sync_interval(mut self, period: Duration) -> Self {
        self.sync_interval = period;
        self
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// The scope currently being polled, if started.
    pub fn scope(&self) -> Option<Arc<ProjectScope>> {
        self.active.lock().as_ref().map(|a| Arc::clone(&a.scope))
    }

    /// Activate `project_id` (or the unscoped view for `None`).
    ///
    /// Any running poll loop is stopped first and its scope discarded, so
    /// two loops never overlap. The new scope syncs immediately.
    pub fn switch_project(&self, project_id: Option<String>) -> Arc<ProjectScope> {
        let scope = Arc::new(ProjectScope::new(
            project_id.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.connections),
            self.verification.clone(),
        ));

        let mut active = self.active.lock();
        if let Some(mut previous) = active.take() {
            previous.handle.stop();
            tracing::info!(
                from = ?previous.scope.project_id(),
                to = ?project_id,
                "Switching project scope"
            );
        }
        let handle = scheduler::start(Arc::clone(&scope), self.sync_interval);
        *active = Some(ActiveScope {
            scope: Arc::clone(&scope),
            handle,
        });
        scope
    }

    /// Stop polling. In-flight requests are left to resolve.
    pub fn stop(&self) {
        if let Some(mut previous) = self.active.lock().take() {
            previous.handle.stop();
        }
    }

    fn require_scope(&self) -> Result<Arc<ProjectScope>, LighthouseError> {
        self.scope()
            .ok_or_else(|| LighthouseError::Other("dashboard has no active project scope".into()))
    }

    /// Submit a prompt into the active scope. See `ProjectScope::submit`.
    pub async fn submit(
        &self,
        prompt: &str,
        connection_id: Option<&ConnectionId>,
    ) -> Result<Trace, LighthouseError> {
        let scope = self.require_scope()?;
        scope.submit(prompt, connection_id).await
    }

    /// Delete every trace on the backend, then re-sync.
    pub async fn clear_traces(&self) -> Result<(), LighthouseError> {
        let scope = self.require_scope()?;
        self.backend.clear_traces().await?;
        scope.store().clear();
        scope.spawn_sync();
        tracing::info!("Cleared all traces");
        Ok(())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop();
    }
}
