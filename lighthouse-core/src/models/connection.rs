use serde::{Deserialize, Serialize};

use super::{null_as_default, ConnectionId};

/// A configured database credential set.
///
/// `is_connected` is set by a prior test/connect call on the backend; the
/// orchestrator trusts it and never probes the database itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConnection {
    pub id: ConnectionId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub database: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}
