pub mod connections;
pub mod dashboard;
pub mod dispatcher;
pub mod reporter;
pub mod scheduler;
pub mod scope;
pub mod startup;
pub mod store;
mod submit;

#[cfg(test)]
mod testing;

pub use connections::ConnectionRegistry;
pub use dashboard::Dashboard;
pub use dispatcher::{CheckState, CheckTrigger, VerificationDispatcher};
pub use scheduler::SyncHandle;
pub use scope::{ProjectScope, SyncReport};
pub use store::{TraceSnapshot, TraceStore};
