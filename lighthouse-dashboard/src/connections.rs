//! Connection Registry — connected databases available for grounding
//! hallucination checks.

use std::sync::Arc;

use lighthouse_core::{DbConnection, TraceBackend};
use parking_lot::RwLock;

pub struct ConnectionRegistry {
    backend: Arc<dyn TraceBackend>,
    connections: RwLock<Vec<DbConnection>>,
}

impl ConnectionRegistry {
    pub fn new(backend: Arc<dyn TraceBackend>) -> Self {
        Self {
            backend,
            connections: RwLock::new(Vec::new()),
        }
    }

    /// Reload the list from the backend, keeping only connected entries.
    ///
    /// Fails soft: on error the previous list is retained. Returns the
    /// number of connected entries held afterwards.
    pub async fn refresh(&self) -> usize {
        match self.backend.list_connections().await {
            Ok(all) => {
                let total = all.len();
                let connected = self.replace(all);
                tracing::debug!(total, connected, "Refreshed database connections");
                connected
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load database connections, keeping previous list");
                self.connections.read().len()
            }
        }
    }

    /// Install a connection list, dropping entries not flagged connected.
    pub fn replace(&self, all: Vec<DbConnection>) -> usize {
        let connected: Vec<DbConnection> = all.into_iter().filter(|c| c.is_connected).collect();
        let n = connected.len();
        *self.connections.write() = connected;
        n
    }

    /// First connected entry in backend order.
    pub fn primary(&self) -> Option<DbConnection> {
        self.connections.read().first().cloned()
    }

    pub fn all(&self) -> Vec<DbConnection> {
        self.connections.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
