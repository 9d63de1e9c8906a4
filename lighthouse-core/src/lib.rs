pub mod backend;
pub mod config;
pub mod error;
pub mod models;

pub use backend::{HttpBackend, TraceBackend};
pub use config::LighthouseConfig;
pub use error::LighthouseError;
pub use models::{
    ConfidenceLevel, ConnectionId, DbConnection, HallucinationResult, Stats, Trace, TraceId,
    TracePatch,
};
