//! Isolate Core: the protocol shared by hosts and sandboxed workers.
//!
//! A host delegates typed units of work to a worker running behind a
//! process boundary. The worker answers with exactly one outcome per
//! request, and may call back into host-owned services while it works.
//! This crate holds the pieces both sides agree on:
//!
//! - [`OperationCode`], [`DataAccessOp`], [`StatusCode`]: the closed code sets
//! - [`Bundle`]: the opaque key/value blob carried by every call
//! - [`DataAccessService`] and friends: capability handles to host services
//! - [`completion_slot`]: the single-use handoff from a callback to a blocked caller
//! - [`SyncAdapter`]: blocking calls over one-shot asynchronous services
//!
//! # Example
//!
//! ```rust,ignore
//! use isolate_core::{AdapterConfig, Bundle, DataAccessOp, Logger, SyncAdapter};
//!
//! let adapter = SyncAdapter::new(handle, AdapterConfig::default(), Logger::new("remote"));
//! let keys: Vec<String> = adapter.call_for_result(DataAccessOp::RemoteKeyset, Bundle::new())?;
//! ```

pub use bytes::Bytes;

pub mod adapter;
pub mod bundle;
pub mod capability;
pub mod codes;
mod error;
pub mod logging;
pub mod records;
pub mod slot;

pub use adapter::{await_completion, AdapterConfig, SyncAdapter};
pub use bundle::{keys, Bundle, CodecError};
pub use capability::{
    ApiName, DataAccessHandle, DataAccessService, FederatedComputeHandle,
    FederatedComputeService, ModelService, ModelServiceHandle,
};
pub use codes::{data_access_status, DataAccessOp, OperationCode, StatusCode};
pub use error::{CallError, Result, TransportError};
pub use logging::Logger;
pub use records::{
    EventLogRecord, JoinedLogRecord, ModelId, ModelTable, RequestLogRecord, Row,
    SchedulingMode, TrainingInterval, TrainingOptions,
};
pub use slot::{completion_slot, Completion, Outcome, SlotError, SlotReader};
