//! Numeric codes that cross the process boundary.
//!
//! Three closed sets live here:
//!
//! - [`OperationCode`]: host → worker requests handled by the dispatcher
//! - [`DataAccessOp`]: worker → host sub-operations issued through the
//!   synchronous adapter
//! - [`StatusCode`]: the error codes a response envelope may carry
//!
//! Raw `i32` values arrive from the transport; conversion is fallible and an
//! unknown value hands the raw number back so the caller can report it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operations a host can ask an isolated worker to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum OperationCode {
    Execute = 1,
    DownloadCompleted = 2,
    Render = 3,
    WebViewEvent = 4,
    TrainingExample = 5,
    WebTrigger = 6,
}

impl OperationCode {
    /// All operation codes, in wire order.
    pub const ALL: [OperationCode; 6] = [
        OperationCode::Execute,
        OperationCode::DownloadCompleted,
        OperationCode::Render,
        OperationCode::WebViewEvent,
        OperationCode::TrainingExample,
        OperationCode::WebTrigger,
    ];

    /// The wire value of this code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Stable lowercase name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            OperationCode::Execute => "execute",
            OperationCode::DownloadCompleted => "download_completed",
            OperationCode::Render => "render",
            OperationCode::WebViewEvent => "web_view_event",
            OperationCode::TrainingExample => "training_example",
            OperationCode::WebTrigger => "web_trigger",
        }
    }
}

impl TryFrom<i32> for OperationCode {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        OperationCode::ALL
            .into_iter()
            .find(|op| op.code() == raw)
            .ok_or(raw)
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data-access sub-operations a worker issues against host-owned stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataAccessOp {
    RemoteLookup = 1,
    RemoteKeyset = 2,
    GetEventUrl = 3,
    LocalLookup = 4,
    LocalKeyset = 5,
    LocalPut = 6,
    LocalRemove = 7,
    GetRequestIds = 8,
    GetEventIds = 9,
    GetEventIdsForRequest = 10,
    GetRequestLogRecord = 11,
    GetJoinedLogRecord = 12,
    GetModel = 13,
}

impl DataAccessOp {
    /// All sub-operations, in wire order.
    pub const ALL: [DataAccessOp; 13] = [
        DataAccessOp::RemoteLookup,
        DataAccessOp::RemoteKeyset,
        DataAccessOp::GetEventUrl,
        DataAccessOp::LocalLookup,
        DataAccessOp::LocalKeyset,
        DataAccessOp::LocalPut,
        DataAccessOp::LocalRemove,
        DataAccessOp::GetRequestIds,
        DataAccessOp::GetEventIds,
        DataAccessOp::GetEventIdsForRequest,
        DataAccessOp::GetRequestLogRecord,
        DataAccessOp::GetJoinedLogRecord,
        DataAccessOp::GetModel,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            DataAccessOp::RemoteLookup => "remote_lookup",
            DataAccessOp::RemoteKeyset => "remote_keyset",
            DataAccessOp::GetEventUrl => "get_event_url",
            DataAccessOp::LocalLookup => "local_lookup",
            DataAccessOp::LocalKeyset => "local_keyset",
            DataAccessOp::LocalPut => "local_put",
            DataAccessOp::LocalRemove => "local_remove",
            DataAccessOp::GetRequestIds => "get_request_ids",
            DataAccessOp::GetEventIds => "get_event_ids",
            DataAccessOp::GetEventIdsForRequest => "get_event_ids_for_request",
            DataAccessOp::GetRequestLogRecord => "get_request_log_record",
            DataAccessOp::GetJoinedLogRecord => "get_joined_log_record",
            DataAccessOp::GetModel => "get_model",
        }
    }

    /// Whether the operation mutates host state.
    pub fn is_write(self) -> bool {
        matches!(self, DataAccessOp::LocalPut | DataAccessOp::LocalRemove)
    }
}

impl TryFrom<i32> for DataAccessOp {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        DataAccessOp::ALL
            .into_iter()
            .find(|op| op.code() == raw)
            .ok_or(raw)
    }
}

impl fmt::Display for DataAccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status codes carried by a response envelope.
///
/// Worker-side failures of any kind collapse into [`StatusCode::InternalError`];
/// the remaining codes are produced by the host when it cannot reach or load
/// the worker at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    Success = 0,
    InternalError = 100,
    NameNotFound = 101,
    ClassNotFound = 102,
    ServiceFailed = 103,
    PersonalizationDisabled = 104,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Success,
        StatusCode::InternalError,
        StatusCode::NameNotFound,
        StatusCode::ClassNotFound,
        StatusCode::ServiceFailed,
        StatusCode::PersonalizationDisabled,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl TryFrom<i32> for StatusCode {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|status| status.code() == raw)
            .ok_or(raw)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "success",
            StatusCode::InternalError => "internal error",
            StatusCode::NameNotFound => "name not found",
            StatusCode::ClassNotFound => "class not found",
            StatusCode::ServiceFailed => "service failed",
            StatusCode::PersonalizationDisabled => "personalization disabled",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Failure codes a host data-access service reports through a completion.
///
/// These are opaque to the adapter, which only carries the number back to
/// the caller.
pub mod data_access_status {
    pub const KEY_NOT_FOUND: i32 = 200;
    pub const LOCAL_DATA_READ_ONLY: i32 = 201;
    pub const TIMESTAMPS_INVALID: i32 = 202;
    pub const DATA_ACCESS_FAILURE: i32 = 203;
    pub const UNSUPPORTED_OP: i32 = 204;
}
