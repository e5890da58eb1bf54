//! Isolate Host: in-memory implementations of the host capabilities.
//!
//! These back the capability handles a worker receives with plain data
//! structures, so a host can be wired up in-process:
//!
//! - [`InMemoryDataAccess`]: key/value tables, request and event logs, event URLs
//! - [`RecordingScheduler`]: federated compute jobs
//! - [`FnModelService`]: inference through a closure
//!
//! Each service completes requests either inline or from a `tokio`
//! runtime, which makes them suitable both for unit tests and for
//! exercising the cross-thread completion path.

mod data_access;
pub mod event_url;
mod federated;
mod model;

pub use data_access::{ApiCallStat, InMemoryDataAccess};
pub use event_url::EventUrlPayload;
pub use federated::RecordingScheduler;
pub use model::FnModelService;
