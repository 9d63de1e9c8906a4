//! Trace Store — the single source of truth for trace content in one
//! project scope.
//!
//! The list lives inside a `watch` channel so a renderer can subscribe to
//! read-only snapshots. Every mutation runs inside `send_modify` /
//! `send_if_modified`, which makes each operation atomic with respect to
//! the others.

use std::collections::HashMap;
use std::sync::Arc;

use lighthouse_core::{Trace, TraceId, TracePatch};
use tokio::sync::watch;

/// Newest-first list of traces. Unchanged traces keep their `Arc` across
/// refreshes so subscribers can skip them with `Arc::ptr_eq`.
pub type TraceSnapshot = Arc<Vec<Arc<Trace>>>;

pub struct TraceStore {
    tx: watch::Sender<TraceSnapshot>,
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    pub fn snapshot(&self) -> TraceSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TraceSnapshot> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &TraceId) -> Option<Arc<Trace>> {
        self.tx.borrow().iter().find(|t| &t.id == id).cloned()
    }

    /// Replace the whole list after a full sync.
    pub fn replace_all(&self, traces: Vec<Trace>) {
        self.tx.send_modify(|snapshot| {
            let previous: HashMap<&TraceId, &Arc<Trace>> =
                snapshot.iter().map(|t| (&t.id, t)).collect();

            let next: Vec<Arc<Trace>> = traces
                .into_iter()
                .map(|trace| match previous.get(&trace.id) {
                    Some(existing) if existing.as_ref() == &trace => Arc::clone(existing),
                    _ => Arc::new(trace),
                })
                .collect();

            *snapshot = Arc::new(next);
        });
    }

    /// Insert a freshly submitted trace at the head. A stale copy with the
    /// same id is dropped.
    pub fn prepend(&self, trace: Trace) {
        self.tx.send_modify(|snapshot| {
            let list = Arc::make_mut(snapshot);
            list.retain(|t| t.id != trace.id);
            list.insert(0, Arc::new(trace));
        });
    }

    /// Merge verdict fields into the trace with `id`. Missing ids are a
    /// no-op: a concurrent refresh may have evicted the trace.
    pub fn patch(&self, id: &TraceId, patch: &TracePatch) -> bool {
        self.tx.send_if_modified(|snapshot| {
            let Some(idx) = snapshot.iter().position(|t| &t.id == id) else {
                return false;
            };

            let mut updated = snapshot[idx].as_ref().clone();
            if !updated.apply(patch) {
                return false;
            }

            Arc::make_mut(snapshot)[idx] = Arc::new(updated);
            true
        })
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.is_empty() {
                return false;
            }
            *snapshot = Arc::new(Vec::new());
            true
        });
    }
}
