pub mod connection;
pub mod id;
pub mod stats;
pub mod trace;
pub mod verdict;

pub use connection::DbConnection;
pub use id::{ConnectionId, TraceId};
pub use stats::Stats;
pub use trace::{Trace, TracePatch};
pub use verdict::{ConfidenceLevel, HallucinationResult};

use serde::{Deserialize, Deserializer};

/// Read an explicit JSON `null` the same as a missing field. The backend
/// serializes unset columns of failed calls as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
