//! Startup probe: wait for the backend to answer before polling starts.

use std::time::Duration;

use lighthouse_core::config::StartupConfig;
use lighthouse_core::{LighthouseError, TraceBackend};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// Probe the backend with exponential backoff.
///
/// Only transient failures are retried. `AuthRequired` returns at once:
/// the backend is up but rejects unauthenticated requests, and retrying
/// will not change that.
pub async fn wait_for_backend(
    backend: &dyn TraceBackend,
    config: &StartupConfig,
) -> Result<(), LighthouseError> {
    let strategy = ExponentialBackoff::from_millis(2)
        .factor((config.probe_delay_ms / 2).max(1))
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(config.probe_attempts.saturating_sub(1));

    RetryIf::spawn(strategy, || backend.probe(), |e: &LighthouseError| {
        let retry = e.is_transient();
        if retry {
            tracing::warn!(error = %e, "Backend not reachable yet, retrying");
        }
        retry
    })
    .await
}
