use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{null_as_default, ConfidenceLevel, HallucinationResult, TraceId};

/// One logged AI invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub id: TraceId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens_used: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_usd: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latency_ms: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_data: Option<Value>,
}

impl Trace {
    /// A verdict is present once the backend has filled `hallucinationData`.
    /// An empty string counts as absent.
    pub fn has_verdict(&self) -> bool {
        match &self.hallucination_data {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// True when the trace still needs a hallucination check.
    pub fn is_pending_verification(&self) -> bool {
        !self.has_verdict() && !self.response.trim().is_empty()
    }

    /// Decode the verdict payload. Undecodable payloads are logged and
    /// treated as missing.
    pub fn verdict(&self) -> Option<HallucinationResult> {
        if !self.has_verdict() {
            return None;
        }
        let raw = self.hallucination_data.as_ref()?;
        match HallucinationResult::decode(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(trace_id = %self.id, error = %e, "Failed to decode hallucination data");
                None
            }
        }
    }

    /// Confidence to display: the trace score, then the verdict score, then
    /// 100 for a verdict that carries no score at all.
    pub fn effective_confidence(&self) -> Option<f64> {
        if let Some(score) = self.confidence_score {
            return Some(score);
        }
        let verdict = self.verdict()?;
        Some(verdict.confidence_score.unwrap_or(100.0))
    }

    pub fn confidence_level(&self) -> Option<ConfidenceLevel> {
        self.effective_confidence().map(ConfidenceLevel::from_score)
    }

    /// Parse `createdAt`. Accepts RFC 3339 as well as the zone-less
    /// `LocalDateTime` form, which is read as UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Merge a patch into this trace. Returns whether anything changed.
    pub fn apply(&mut self, patch: &TracePatch) -> bool {
        let mut changed = false;
        if let Some(score) = patch.confidence_score {
            if self.confidence_score != Some(score) {
                self.confidence_score = Some(score);
                changed = true;
            }
        }
        if let Some(data) = &patch.hallucination_data {
            if self.hallucination_data.as_ref() != Some(data) {
                self.hallucination_data = Some(data.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Partial update applied to a stored trace. `None` fields are left alone,
/// so a patch can only add verdict information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracePatch {
    pub confidence_score: Option<f64>,
    pub hallucination_data: Option<Value>,
}

impl TracePatch {
    /// Extract the verdict fields from a trace returned by the check endpoint.
    pub fn verdict_of(checked: &Trace) -> Self {
        Self {
            confidence_score: checked.confidence_score,
            hallucination_data: checked.hallucination_data.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confidence_score.is_none() && self.hallucination_data.is_none()
    }
}
