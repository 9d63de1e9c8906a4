//! Query Submission Flow — submit a prompt, show the resulting trace at
//! once and start its hallucination check without waiting for a poll tick.

use std::sync::Arc;

use lighthouse_core::{ConnectionId, LighthouseError, Trace};

use crate::dispatcher::CheckTrigger;
use crate::scope::ProjectScope;

impl ProjectScope {
    /// Submit `prompt`, grounded in `connection_id` when one is given.
    ///
    /// Unlike background work, a failed submission is returned to the
    /// caller and not retried.
    pub async fn submit(
        self: &Arc<Self>,
        prompt: &str,
        connection_id: Option<&ConnectionId>,
    ) -> Result<Trace, LighthouseError> {
        tracing::debug!(
            grounded = connection_id.is_some(),
            connection_id = ?connection_id.map(|c| c.as_str()),
            "Submitting query"
        );

        let result = match connection_id {
            Some(conn) => self.backend().query_with_db(prompt, conn).await,
            None => self.backend().query(prompt).await,
        };
        let trace = match result {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Query failed");
                return Err(e);
            }
        };

        self.store().prepend(trace.clone());

        if !trace.has_verdict() {
            self.dispatcher()
                .consider_batch([&trace], CheckTrigger::Submission);
        }

        // Full re-sync for stats consistency.
        self.spawn_sync();

        tracing::info!(trace_id = %trace.id, latency_ms = trace.latency_ms, "Query completed");
        Ok(trace)
    }
}
