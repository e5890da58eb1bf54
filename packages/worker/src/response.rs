//! The single response each dispatched request produces.
//!
//! A [`Reply`] is handed to the handler. Whatever happens afterwards, the
//! host's [`IsolatedServiceCallback`] is invoked exactly once: with the
//! encoded output on success, or with `INTERNAL_ERROR` when the handler
//! reports no result, fails, panics, or drops the reply.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::oneshot;

use isolate_core::{Logger, OperationCode, StatusCode, TransportError};

use crate::error::IsolatedServiceError;

/// Timing reported alongside a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalleeMetadata {
    /// Time from request token creation to completion.
    pub elapsed: Duration,
}

/// What the host receives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceResponse {
    Success {
        result: Bytes,
        metadata: CalleeMetadata,
    },
    Error {
        code: StatusCode,
    },
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ServiceResponse::Success { .. })
    }

    /// The error code, or [`StatusCode::Success`].
    pub fn code(&self) -> StatusCode {
        match self {
            ServiceResponse::Success { .. } => StatusCode::Success,
            ServiceResponse::Error { code } => *code,
        }
    }

    /// Decode the success payload.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        match self {
            ServiceResponse::Success { result, .. } => Some(serde_json::from_slice(result)),
            ServiceResponse::Error { .. } => None,
        }
    }
}

/// Host-supplied receiver of the response. Consumed by the single call.
pub trait IsolatedServiceCallback: Send {
    fn on_success(
        self: Box<Self>,
        result: Bytes,
        metadata: CalleeMetadata,
    ) -> Result<(), TransportError>;

    fn on_error(self: Box<Self>, code: StatusCode) -> Result<(), TransportError>;
}

impl IsolatedServiceCallback for oneshot::Sender<ServiceResponse> {
    fn on_success(
        self: Box<Self>,
        result: Bytes,
        metadata: CalleeMetadata,
    ) -> Result<(), TransportError> {
        self.send(ServiceResponse::Success { result, metadata })
            .map_err(|_| TransportError::new("response receiver dropped"))
    }

    fn on_error(self: Box<Self>, code: StatusCode) -> Result<(), TransportError> {
        self.send(ServiceResponse::Error { code })
            .map_err(|_| TransportError::new("response receiver dropped"))
    }
}

/// Delivers at most one response to the host callback.
pub(crate) struct ResponseSink {
    op: OperationCode,
    started: Instant,
    callback: Mutex<Option<Box<dyn IsolatedServiceCallback>>>,
    logger: Logger,
}

impl ResponseSink {
    pub(crate) fn new(
        op: OperationCode,
        started: Instant,
        callback: Box<dyn IsolatedServiceCallback>,
        logger: Logger,
    ) -> Self {
        Self {
            op,
            started,
            callback: Mutex::new(Some(callback)),
            logger,
        }
    }

    fn take(&self) -> Option<Box<dyn IsolatedServiceCallback>> {
        self.callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    pub(crate) fn success(&self, result: Bytes) {
        let Some(callback) = self.take() else {
            self.logger
                .debug(format_args!("{}: response already sent", self.op));
            return;
        };
        let metadata = CalleeMetadata {
            elapsed: self.started.elapsed(),
        };
        self.logger.debug(format_args!(
            "{}: success in {:?}",
            self.op, metadata.elapsed
        ));
        if let Err(e) = callback.on_success(result, metadata) {
            self.logger
                .warn(format_args!("{}: callback failed: {}", self.op, e));
        }
    }

    pub(crate) fn error(&self, code: StatusCode) {
        let Some(callback) = self.take() else {
            self.logger
                .debug(format_args!("{}: response already sent", self.op));
            return;
        };
        self.logger.debug(format_args!("{}: {}", self.op, code));
        if let Err(e) = callback.on_error(code) {
            self.logger
                .warn(format_args!("{}: callback failed: {}", self.op, e));
        }
    }
}

/// Completes one request with its typed output.
///
/// `Reply` is `Send`, so a handler may move it to another thread and
/// complete it there.
#[must_use = "an unsent reply reports INTERNAL_ERROR when dropped"]
pub struct Reply<T> {
    sink: Option<Arc<ResponseSink>>,
    _output: PhantomData<fn(T)>,
}

impl<T: Serialize> Reply<T> {
    pub(crate) fn new(sink: Arc<ResponseSink>) -> Self {
        Self {
            sink: Some(sink),
            _output: PhantomData,
        }
    }

    /// Complete with `output`.
    pub fn send(self, output: T) {
        self.complete(Some(output));
    }

    /// Complete without a result. The host sees `INTERNAL_ERROR`.
    pub fn send_none(self) {
        self.complete(None);
    }

    pub fn complete(mut self, output: Option<T>) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        match output {
            Some(output) => match serde_json::to_vec(&output) {
                Ok(encoded) => sink.success(Bytes::from(encoded)),
                Err(e) => {
                    sink.logger
                        .error(format_args!("{}: failed to encode output: {}", sink.op, e));
                    sink.error(StatusCode::InternalError);
                }
            },
            None => {
                sink.logger
                    .warn(format_args!("{}: handler returned no result", sink.op));
                sink.error(StatusCode::InternalError);
            }
        }
    }

    /// Complete with a handler error. The code stays on this side.
    pub fn fail(mut self, error: IsolatedServiceError) {
        if let Some(sink) = self.sink.take() {
            sink.logger
                .warn(format_args!("{}: handler failed: {}", sink.op, error));
            sink.error(StatusCode::InternalError);
        }
    }
}

impl<T> Drop for Reply<T> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            if !sink.is_done() {
                sink.logger
                    .warn(format_args!("{}: reply dropped without a result", sink.op));
            }
            sink.error(StatusCode::InternalError);
        }
    }
}

impl<T> std::fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply")
            .field("pending", &self.sink.is_some())
            .finish()
    }
}
