//! Error types for calls a worker makes into host services.

use std::time::Duration;

use thiserror::Error;

use crate::bundle::CodecError;

/// The host service could not be reached to issue a call.
///
/// Raised by a capability handle when the request itself fails to leave
/// the process, before any completion can be posted.
#[derive(Debug, Clone, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised locally by a blocking call into a host service.
///
/// `call` names the sub-operation (e.g. `remote_lookup`, `schedule`). None
/// of the variants carry host internals beyond a numeric code.
#[derive(Debug, Error)]
pub enum CallError {
    /// The host completed the call with an error code.
    #[error("{call} failed with code {code}")]
    Remote { call: &'static str, code: i32 },

    /// The completion was abandoned before an outcome was posted.
    #[error("interrupted while waiting for {call}")]
    Interrupted { call: &'static str },

    /// No outcome arrived within the configured wait.
    #[error("timed out after {after:?} waiting for {call}")]
    TimedOut { call: &'static str, after: Duration },

    /// The call could not be issued.
    #[error("could not issue {call}: {source}")]
    Transport {
        call: &'static str,
        #[source]
        source: TransportError,
    },

    /// The host reported success without the expected result entry.
    #[error("{call} result is missing '{key}'")]
    MissingResult { call: &'static str, key: &'static str },

    /// The caller passed arguments the call cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The capability this call needs was not granted to the request.
    #[error("{0} is not available for this request")]
    Unavailable(&'static str),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl CallError {
    /// The host-reported code, if this error came from the host.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            CallError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for host service calls.
pub type Result<T> = std::result::Result<T, CallError>;
