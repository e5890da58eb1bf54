//! Error types for the worker dispatcher.

use thiserror::Error;

use isolate_core::{CodecError, OperationCode};

/// Local failures raised by [`crate::Dispatcher::dispatch`].
///
/// These are programming errors on the calling side. They are returned
/// synchronously, before any handler runs, and are never reported through
/// the result callback.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The operation code is not one the dispatcher knows.
    #[error("invalid operation code: {0}")]
    UnknownOperation(i32),

    /// The encoded input blob was required but absent.
    #[error("{op}: missing input")]
    MissingInput { op: OperationCode },

    /// A required field of the decoded input was absent or empty.
    #[error("{op}: missing required field '{field}'")]
    MissingField {
        op: OperationCode,
        field: &'static str,
    },

    /// A capability handle the operation depends on was not supplied.
    #[error("{op}: missing capability '{capability}'")]
    MissingCapability {
        op: OperationCode,
        capability: &'static str,
    },

    /// The input blob could not be decoded.
    #[error("{op}: malformed input: {source}")]
    Decode {
        op: OperationCode,
        #[source]
        source: CodecError,
    },
}

/// Error a worker handler reports instead of a result.
///
/// The code is logged on the worker side only; the host always sees
/// `INTERNAL_ERROR`.
#[derive(Debug, Clone, Error)]
#[error("isolated service error {code}")]
pub struct IsolatedServiceError {
    code: i32,
}

impl IsolatedServiceError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl From<isolate_core::CallError> for IsolatedServiceError {
    fn from(error: isolate_core::CallError) -> Self {
        Self::new(error.remote_code().unwrap_or(0))
    }
}

/// Result type alias for dispatch.
pub type Result<T> = std::result::Result<T, DispatchError>;
