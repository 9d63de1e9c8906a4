//! Trace backend client
//!
//! `TraceBackend` abstracts the REST contract the dashboard consumes:
//! - `GET    /traces?projectId=`           — trace list, newest first
//! - `GET    /traces/stats?projectId=`     — aggregate stats
//! - `POST   /traces/query`                — plain prompt
//! - `POST   /traces/query-with-db`        — database-grounded prompt
//! - `POST   /traces/{id}/check-hallucinations`
//! - `GET    /db-connections`
//! - `DELETE /traces/clear`
//!
//! `HttpBackend` is the reqwest implementation. Every non-2xx response is a
//! failure; 403 is reported as `AuthRequired`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::LighthouseError;
use crate::models::{ConnectionId, DbConnection, Stats, Trace, TraceId};

pub type Result<T> = std::result::Result<T, LighthouseError>;

// ============================================================================
// TraceBackend trait
// ============================================================================

#[async_trait]
pub trait TraceBackend: Send + Sync {
    /// Fetch the trace list, optionally scoped to a project.
    async fn list_traces(&self, project_id: Option<&str>) -> Result<Vec<Trace>>;

    async fn stats(&self, project_id: Option<&str>) -> Result<Stats>;

    /// Submit a prompt without database context.
    async fn query(&self, prompt: &str) -> Result<Trace>;

    /// Submit a prompt grounded in the given database connection.
    async fn query_with_db(&self, prompt: &str, connection_id: &ConnectionId) -> Result<Trace>;

    /// Ask the backend to score `trace_id` against `connection_id`. The
    /// returned trace carries `confidenceScore` and `hallucinationData`.
    async fn check_hallucinations(
        &self,
        trace_id: &TraceId,
        connection_id: &ConnectionId,
    ) -> Result<Trace>;

    async fn list_connections(&self) -> Result<Vec<DbConnection>>;

    async fn clear_traces(&self) -> Result<()>;

    /// Cheap reachability check. Defaults to an unscoped trace listing.
    async fn probe(&self) -> Result<()> {
        self.list_traces(None).await.map(|_| ())
    }
}

// ============================================================================
// Wire DTOs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryWithDbRequest<'a> {
    prompt: &'a str,
    db_connection_id: &'a ConnectionId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest<'a> {
    db_connection_id: &'a ConnectionId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// ============================================================================
// HttpBackend
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client against an explicit base URL (for testing / tooling)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = BackendConfig {
            base_url: base_url.into(),
            request_timeout_seconds: None,
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Append `segments` to the base URL, percent-encoding each one. Used
    /// where an opaque id becomes part of the path.
    fn segment_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LighthouseError::Other(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| LighthouseError::Other(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn scoped(&self, req: RequestBuilder, project_id: Option<&str>) -> RequestBuilder {
        match project_id {
            Some(id) => req.query(&[("projectId", id)]),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(LighthouseError::AuthRequired);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or(body);

        tracing::debug!(status = status.as_u16(), message = %message, "Backend returned error");

        Err(LighthouseError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TraceBackend for HttpBackend {
    async fn list_traces(&self, project_id: Option<&str>) -> Result<Vec<Trace>> {
        let req = self.scoped(self.client.get(self.url("/traces")), project_id);
        self.send_json(req).await
    }

    async fn stats(&self, project_id: Option<&str>) -> Result<Stats> {
        let req = self.scoped(self.client.get(self.url("/traces/stats")), project_id);
        self.send_json(req).await
    }

    async fn query(&self, prompt: &str) -> Result<Trace> {
        let req = self
            .client
            .post(self.url("/traces/query"))
            .json(&QueryRequest { prompt });
        self.send_json(req).await
    }

    async fn query_with_db(&self, prompt: &str, connection_id: &ConnectionId) -> Result<Trace> {
        let req = self
            .client
            .post(self.url("/traces/query-with-db"))
            .json(&QueryWithDbRequest {
                prompt,
                db_connection_id: connection_id,
            });
        self.send_json(req).await
    }

    async fn check_hallucinations(
        &self,
        trace_id: &TraceId,
        connection_id: &ConnectionId,
    ) -> Result<Trace> {
        let url = self.segment_url(&["traces", trace_id.as_str(), "check-hallucinations"])?;
        let req = self
            .client
            .post(url)
            .json(&CheckRequest {
                db_connection_id: connection_id,
            });
        self.send_json(req).await
    }

    async fn list_connections(&self) -> Result<Vec<DbConnection>> {
        self.send_json(self.client.get(self.url("/db-connections")))
            .await
    }

    async fn clear_traces(&self) -> Result<()> {
        self.send(self.client.delete(self.url("/traces/clear")))
            .await
            .map(|_| ())
    }
}

// ============================================================================
// TESTS
// ============================================================================
