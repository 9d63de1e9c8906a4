use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded hallucination verdict for a trace response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HallucinationResult {
    pub confidence_score: Option<f64>,
    pub unsupported_claims: Vec<String>,
    pub supported_claims: Vec<String>,
    pub ai_review: String,
    pub has_hallucinations: bool,
}

impl HallucinationResult {
    /// Decode a raw `hallucinationData` payload.
    ///
    /// The backend stores the verdict as a JSON-encoded string; an inline
    /// object is accepted as well.
    pub fn decode(raw: &Value) -> Result<Self, serde_json::Error> {
        match raw {
            Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        }
    }
}

/// Display bucket for a confidence score in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Supported,
    Warning,
    Hallucination,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            ConfidenceLevel::Supported
        } else if score >= 50.0 {
            ConfidenceLevel::Warning
        } else {
            ConfidenceLevel::Hallucination
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::Supported => "Supported",
            ConfidenceLevel::Warning => "Warning",
            ConfidenceLevel::Hallucination => "Hallucination Detected",
        }
    }
}
