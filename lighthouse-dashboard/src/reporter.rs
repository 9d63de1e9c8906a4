//! Headless view: follows the store and stats snapshots of a scope and logs
//! what a rendered dashboard would show.

use std::collections::HashSet;
use std::sync::Arc;

use lighthouse_core::{Trace, TraceId};
use tokio::sync::broadcast;

use crate::scope::ProjectScope;

/// Traces in `snapshot` whose verdict has not been reported yet. Marks them
/// as reported and forgets ids no longer in the snapshot.
pub fn newly_verified(seen: &mut HashSet<TraceId>, snapshot: &[Arc<Trace>]) -> Vec<Arc<Trace>> {
    let present: HashSet<&TraceId> = snapshot.iter().map(|t| &t.id).collect();
    seen.retain(|id| present.contains(id));

    snapshot
        .iter()
        .filter(|t| t.has_verdict() && seen.insert(t.id.clone()))
        .cloned()
        .collect()
}

pub async fn run_reporter(scope: Arc<ProjectScope>, mut shutdown: broadcast::Receiver<()>) {
    let mut traces_rx = scope.store().subscribe();
    let mut stats_rx = scope.subscribe_stats();
    let mut seen = HashSet::new();
    let mut last_len = 0usize;

    loop {
        tokio::select! {
            changed = traces_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = traces_rx.borrow_and_update().clone();
                if snapshot.len() != last_len {
                    tracing::info!(traces = snapshot.len(), "Trace list updated");
                    last_len = snapshot.len();
                }
                for trace in newly_verified(&mut seen, &snapshot) {
                    let level = trace.confidence_level().map(|l| l.label()).unwrap_or("Unknown");
                    tracing::info!(
                        trace_id = %trace.id,
                        confidence = ?trace.effective_confidence(),
                        verdict = level,
                        "Verdict available"
                    );
                }
            }
            changed = stats_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let stats = stats_rx.borrow_and_update().clone();
                if let Some(stats) = stats {
                    tracing::info!(
                        total_cost = %format!("${:.6}", stats.total_cost),
                        total_requests = stats.total_requests,
                        average_latency_ms = stats.average_latency.round() as u64,
                        "Stats"
                    );
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
