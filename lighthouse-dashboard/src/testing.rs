//! In-memory `TraceBackend` and fixtures for orchestrator unit tests
//! (no HTTP).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lighthouse_core::backend::Result;
use lighthouse_core::{
    ConnectionId, DbConnection, LighthouseError, Stats, Trace, TraceBackend, TraceId,
};
use parking_lot::Mutex;

pub fn trace(id: &str, response: &str) -> Trace {
    Trace {
        id: TraceId::new(id),
        prompt: format!("prompt {}", id),
        response: response.to_string(),
        tokens_used: 10,
        cost_usd: 0.0001,
        latency_ms: 100,
        provider: "openai".to_string(),
        created_at: "2025-03-01T10:15:30".to_string(),
        confidence_score: None,
        hallucination_data: None,
    }
}

pub fn verified(id: &str, score: f64) -> Trace {
    let mut t = trace(id, "answer");
    t.confidence_score = Some(score);
    t.hallucination_data = Some(verdict_payload(score));
    t
}

pub fn verdict_payload(score: f64) -> serde_json::Value {
    serde_json::Value::String(
        serde_json::json!({
            "confidenceScore": score,
            "unsupportedClaims": [],
            "supportedClaims": ["claim"],
            "aiReview": "ok",
            "hasHallucinations": score < 50.0,
        })
        .to_string(),
    )
}

pub fn connection(id: &str, is_connected: bool) -> DbConnection {
    DbConnection {
        id: ConnectionId::new(id),
        name: format!("db {}", id),
        host: "localhost".to_string(),
        port: 5432,
        database: "hospitals".to_string(),
        username: "reader".to_string(),
        is_connected,
        last_error: None,
        created_at: "2025-03-01T10:00:00".to_string(),
    }
}

fn unavailable() -> LighthouseError {
    LighthouseError::Api {
        status: 503,
        message: "unavailable".to_string(),
    }
}

/// Scriptable backend. Checks do not persist their verdict unless
/// `persist_verdicts(true)` is set, which lets tests model a verdict that
/// never lands on the backend.
pub struct MockBackend {
    traces: Mutex<Vec<Trace>>,
    stats: Mutex<Stats>,
    connections: Mutex<Vec<DbConnection>>,
    check_calls: Mutex<Vec<(TraceId, ConnectionId)>>,
    check_score: Mutex<f64>,
    check_delay: Mutex<Option<Duration>>,
    fail_list: AtomicBool,
    fail_stats: AtomicBool,
    fail_connections: AtomicBool,
    fail_checks: AtomicBool,
    fail_query: AtomicBool,
    hang_checks: AtomicBool,
    hang_next_stats: AtomicBool,
    persist_verdicts: AtomicBool,
    list_calls: AtomicUsize,
    query_calls: AtomicUsize,
    clear_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            traces: Mutex::new(Vec::new()),
            stats: Mutex::new(Stats::default()),
            connections: Mutex::new(Vec::new()),
            check_calls: Mutex::new(Vec::new()),
            check_score: Mutex::new(80.0),
            check_delay: Mutex::new(None),
            fail_list: AtomicBool::new(false),
            fail_stats: AtomicBool::new(false),
            fail_connections: AtomicBool::new(false),
            fail_checks: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
            hang_checks: AtomicBool::new(false),
            hang_next_stats: AtomicBool::new(false),
            persist_verdicts: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn set_traces(&self, traces: Vec<Trace>) {
        *self.traces.lock() = traces;
    }

    pub fn set_stats(&self, stats: Stats) {
        *self.stats.lock() = stats;
    }

    pub fn set_connections(&self, connections: Vec<DbConnection>) {
        *self.connections.lock() = connections;
    }

    pub fn set_check_score(&self, score: f64) {
        *self.check_score.lock() = score;
    }

    pub fn set_check_delay(&self, delay: Duration) {
        *self.check_delay.lock() = Some(delay);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connections(&self, fail: bool) {
        self.fail_connections.store(fail, Ordering::SeqCst);
    }

    pub fn fail_checks(&self, fail: bool) {
        self.fail_checks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_query(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn hang_checks(&self, hang: bool) {
        self.hang_checks.store(hang, Ordering::SeqCst);
    }

    /// The next `stats` call never returns; later calls behave normally.
    pub fn hang_next_stats(&self) {
        self.hang_next_stats.store(true, Ordering::SeqCst);
    }

    pub fn persist_verdicts(&self, persist: bool) {
        self.persist_verdicts.store(persist, Ordering::SeqCst);
    }

    pub fn check_calls(&self) -> Vec<(TraceId, ConnectionId)> {
        self.check_calls.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn new_trace(&self, prompt: &str) -> Trace {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut t = trace(&format!("q-{}", n), "4");
        t.prompt = prompt.to_string();
        self.traces.lock().insert(0, t.clone());
        t
    }
}

#[async_trait]
impl TraceBackend for MockBackend {
    async fn list_traces(&self, _project_id: Option<&str>) -> Result<Vec<Trace>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.traces.lock().clone())
    }

    async fn stats(&self, _project_id: Option<&str>) -> Result<Stats> {
        if self.hang_next_stats.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.stats.lock().clone())
    }

    async fn query(&self, prompt: &str) -> Result<Trace> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.new_trace(prompt))
    }

    async fn query_with_db(&self, prompt: &str, _connection_id: &ConnectionId) -> Result<Trace> {
        self.query(prompt).await
    }

    async fn check_hallucinations(
        &self,
        trace_id: &TraceId,
        connection_id: &ConnectionId,
    ) -> Result<Trace> {
        self.check_calls
            .lock()
            .push((trace_id.clone(), connection_id.clone()));

        if self.hang_checks.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = *self.check_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let score = *self.check_score.lock();
        let mut traces = self.traces.lock();
        let mut checked = traces
            .iter()
            .find(|t| &t.id == trace_id)
            .cloned()
            .unwrap_or_else(|| trace(trace_id.as_str(), "answer"));
        checked.confidence_score = Some(score);
        checked.hallucination_data = Some(verdict_payload(score));

        if self.persist_verdicts.load(Ordering::SeqCst) {
            if let Some(stored) = traces.iter_mut().find(|t| &t.id == trace_id) {
                *stored = checked.clone();
            }
        }
        Ok(checked)
    }

    async fn list_connections(&self) -> Result<Vec<DbConnection>> {
        if self.fail_connections.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.connections.lock().clone())
    }

    async fn clear_traces(&self) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.traces.lock().clear();
        Ok(())
    }
}
