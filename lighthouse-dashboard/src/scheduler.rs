//! Sync Scheduler — one immediate full sync, then a re-sync on a fixed
//! interval until the returned handle is stopped or dropped.
//!
//! Tick failures are logged and the next tick runs as scheduled; there is
//! no backoff because a stale view heals on the next successful tick. A
//! tick never waits for the previous one's requests to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::scope::ProjectScope;

/// Cancellable handle for a running poll loop.
///
/// Stopping ends the loop before its next tick. Requests already in flight
/// (a running sync, spawned checks) are left to resolve.
pub struct SyncHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn stop(&mut self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Sync loop task ended abnormally");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Each tick syncs on its own task so a request that never returns cannot
/// hold back later ticks.
fn spawn_tick(scope: Arc<ProjectScope>) {
    tokio::spawn(async move {
        match scope.sync_once().await {
            Ok(report) => {
                if report.dispatched > 0 {
                    tracing::debug!(
                        traces = report.traces,
                        dispatched = report.dispatched,
                        "Sync tick complete"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(project_id = ?scope.project_id(), error = %e, "Sync tick failed");
            }
        }
    });
}

/// Start polling `scope` every `period`.
pub fn start(scope: Arc<ProjectScope>, period: Duration) -> SyncHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            project_id = ?scope.project_id(),
            interval_ms = period.as_millis() as u64,
            "Sync loop started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            spawn_tick(Arc::clone(&scope));
        }

        tracing::info!(project_id = ?scope.project_id(), "Sync loop stopped");
    });

    SyncHandle {
        cancel,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::ConnectionRegistry;
    use crate::testing::{connection, trace, MockBackend};
    use lighthouse_core::config::VerificationConfig;

    fn scope(backend: &Arc<MockBackend>) -> Arc<ProjectScope> {
        let connections = Arc::new(ConnectionRegistry::new(backend.clone()));
        Arc::new(ProjectScope::new(
            None,
            backend.clone(),
            connections,
            VerificationConfig::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_sync_then_fixed_interval() {
        let backend = Arc::new(MockBackend::new());
        backend.set_traces(vec![trace("a", "1")]);
        let scope = scope(&backend);

        let handle = start(scope.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.list_calls(), 1);
        assert_eq!(scope.store().len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.list_calls(), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.list_calls(), 4);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_ticks() {
        let backend = Arc::new(MockBackend::new());
        let scope = scope(&backend);

        let mut handle = start(scope, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();
        assert!(handle.is_stopped());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_loop() {
        let backend = Arc::new(MockBackend::new());
        let handle = start(scope(&backend), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_ticks_keep_polling() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_list(true);
        let scope = scope(&backend);

        let handle = start(scope.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.list_calls(), 3);

        backend.fail_list(false);
        backend.set_traces(vec![trace("a", "1")]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(scope.store().len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_does_not_stall_later_ticks() {
        let backend = Arc::new(MockBackend::new());
        backend.set_traces(vec![trace("a", "1")]);
        let scope = scope(&backend);

        let handle = start(scope.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        backend.hang_next_stats();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.list_calls(), 13, "one tick every 5s despite the hung sync");

        backend.set_traces(vec![trace("b", "2"), trace("a", "1")]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(scope.store().len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_ticks_never_duplicate_a_check() {
        let backend = Arc::new(MockBackend::new());
        backend.set_traces(vec![trace("a", "1"), trace("b", "2")]);
        backend.set_connections(vec![connection("c-1", true)]);
        backend.set_check_delay(Duration::from_secs(12));
        let scope = scope(&backend);

        let handle = start(scope.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(backend.list_calls(), 4);
        assert_eq!(backend.check_calls().len(), 2);

        handle.shutdown().await;
    }
}
