use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Aggregate spend and latency for the active project scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_requests: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub average_latency: f64,
}
