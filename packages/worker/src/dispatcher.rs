//! Routes host requests to the worker's typed handlers.
//!
//! [`Dispatcher::dispatch`] is called on a transport thread, once per
//! inbound request. It validates the request, mints a [`RequestToken`],
//! invokes the matching [`IsolatedWorker`] handler and returns as soon as
//! the handler does. The response reaches the host through the supplied
//! callback whenever the handler's [`Reply`] is completed.
//!
//! Validation failures are returned to the caller and never reach the
//! callback. Once a handler has been invoked, the callback is called
//! exactly once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use isolate_core::{
    CodecError, DataAccessHandle, FederatedComputeHandle, Logger, ModelServiceHandle,
    OperationCode, StatusCode, SyncAdapter,
};

use crate::config::WorkerConfig;
use crate::error::{DispatchError, IsolatedServiceError, Result};
use crate::response::{IsolatedServiceCallback, Reply, ResponseSink};
use crate::stores::RemoteData;
use crate::token::{RequestToken, TokenParts};
use crate::types::{
    DownloadCompletedInput, ExecuteInput, RenderInput, TrainingExamplesInput, UserData,
    WebTriggerInput, WebViewEventInput,
};
use crate::worker::{IsolatedService, IsolatedWorker};

/// Everything a request carries besides its operation code.
#[derive(Default)]
pub struct ServiceParams {
    input: Option<Bytes>,
    data_access: Option<DataAccessHandle>,
    downloaded_contents: Option<DataAccessHandle>,
    federated_compute: Option<FederatedComputeHandle>,
    model_service: Option<ModelServiceHandle>,
    user_data: Option<UserData>,
}

impl ServiceParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an already encoded input blob.
    pub fn with_input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Encode `input` and attach it.
    pub fn with_encoded_input<T: Serialize>(
        self,
        input: &T,
    ) -> std::result::Result<Self, CodecError> {
        let encoded = serde_json::to_vec(input).map_err(|e| CodecError::Encode {
            key: "input".to_string(),
            message: e.to_string(),
        })?;
        Ok(self.with_input(encoded))
    }

    pub fn with_data_access(mut self, handle: DataAccessHandle) -> Self {
        self.data_access = Some(handle);
        self
    }

    /// Data access scoped to freshly downloaded contents.
    pub fn with_downloaded_contents(mut self, handle: DataAccessHandle) -> Self {
        self.downloaded_contents = Some(handle);
        self
    }

    pub fn with_federated_compute(mut self, handle: FederatedComputeHandle) -> Self {
        self.federated_compute = Some(handle);
        self
    }

    pub fn with_model_service(mut self, handle: ModelServiceHandle) -> Self {
        self.model_service = Some(handle);
        self
    }

    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = Some(user_data);
        self
    }
}

impl std::fmt::Debug for ServiceParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceParams")
            .field("input_len", &self.input.as_ref().map(Bytes::len))
            .field("data_access", &self.data_access.is_some())
            .field("downloaded_contents", &self.downloaded_contents.is_some())
            .field("federated_compute", &self.federated_compute.is_some())
            .field("model_service", &self.model_service.is_some())
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

/// A validated request, ready for its handler.
enum Request {
    Execute(ExecuteInput),
    DownloadCompleted(DownloadCompletedInput),
    Render(RenderInput),
    WebViewEvent(WebViewEventInput),
    WebTrigger(WebTriggerInput),
    TrainingExamples(TrainingExamplesInput),
}

/// Demultiplexes requests by operation code.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn IsolatedService>,
    config: WorkerConfig,
    logger: Logger,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn IsolatedService>, config: WorkerConfig, logger: Logger) -> Self {
        Self {
            service,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Handle one request identified by `raw_code`.
    pub fn dispatch(
        &self,
        raw_code: i32,
        params: ServiceParams,
        callback: Box<dyn IsolatedServiceCallback>,
    ) -> Result<()> {
        let op = OperationCode::try_from(raw_code).map_err(|raw| {
            self.logger
                .error(format_args!("rejecting unknown operation code {}", raw));
            DispatchError::UnknownOperation(raw)
        })?;

        let (request, parts) = self
            .prepare(op, params)
            .inspect_err(|e| self.logger.error(format_args!("rejecting request: {}", e)))?;

        let span = tracing::debug_span!(
            parent: self.logger.span(),
            "request",
            op = %op,
            id = tracing::field::Empty
        );
        let logger = self.logger.nested("dispatcher", span);
        let token = RequestToken::new(op, parts, self.config.clone(), logger.child("worker"));
        logger
            .span()
            .record("id", tracing::field::display(token.id()));
        logger.debug(format_args!("dispatching {}", op));

        let sink = Arc::new(ResponseSink::new(
            op,
            token.started(),
            callback,
            logger.clone(),
        ));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let worker = self.service.on_request(&token);
            run(worker.as_ref(), request, &sink)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                logger.warn(format_args!("{} handler failed: {}", op, e));
                sink.error(StatusCode::InternalError);
            }
            Err(payload) => {
                logger.error(format_args!(
                    "{} handler panicked: {}",
                    op,
                    panic_message(payload.as_ref())
                ));
                sink.error(StatusCode::InternalError);
            }
        }
        Ok(())
    }

    fn prepare(&self, op: OperationCode, params: ServiceParams) -> Result<(Request, TokenParts)> {
        let ServiceParams {
            input,
            data_access,
            downloaded_contents,
            federated_compute,
            model_service,
            user_data,
        } = params;
        let data_access = require(op, data_access, "data_access")?;

        match op {
            OperationCode::Execute => {
                let federated_compute = require(op, federated_compute, "federated_compute")?;
                let model_service = require(op, model_service, "model_service")?;
                let input: ExecuteInput = decode(op, input)?;
                check(op, input.missing_field())?;
                Ok((
                    Request::Execute(input),
                    TokenParts {
                        data_access,
                        federated_compute: Some(federated_compute),
                        model_service: Some(model_service),
                        user_data,
                    },
                ))
            }
            OperationCode::DownloadCompleted => {
                let federated_compute = require(op, federated_compute, "federated_compute")?;
                let model_service = require(op, model_service, "model_service")?;
                let contents = require(op, downloaded_contents, "downloaded_contents")?;
                let adapter = SyncAdapter::new(
                    contents,
                    self.config.adapter(),
                    self.logger.child("downloaded_contents"),
                );
                Ok((
                    Request::DownloadCompleted(DownloadCompletedInput {
                        downloaded_contents: RemoteData::new(adapter),
                    }),
                    TokenParts {
                        data_access,
                        federated_compute: Some(federated_compute),
                        model_service: Some(model_service),
                        user_data,
                    },
                ))
            }
            OperationCode::Render => {
                let input: RenderInput = decode(op, input)?;
                check(op, input.missing_field())?;
                Ok((
                    Request::Render(input),
                    TokenParts {
                        data_access,
                        federated_compute: None,
                        model_service: None,
                        user_data: None,
                    },
                ))
            }
            OperationCode::WebViewEvent => {
                let model_service = require(op, model_service, "model_service")?;
                let input: WebViewEventInput = decode(op, input)?;
                Ok((
                    Request::WebViewEvent(input),
                    TokenParts {
                        data_access,
                        federated_compute: None,
                        model_service: Some(model_service),
                        user_data,
                    },
                ))
            }
            OperationCode::WebTrigger => {
                let model_service = require(op, model_service, "model_service")?;
                let input: WebTriggerInput = decode(op, input)?;
                check(op, input.missing_field())?;
                Ok((
                    Request::WebTrigger(input),
                    TokenParts {
                        data_access,
                        federated_compute: None,
                        model_service: Some(model_service),
                        user_data,
                    },
                ))
            }
            OperationCode::TrainingExample => {
                let input: TrainingExamplesInput = decode(op, input)?;
                check(op, input.missing_field())?;
                Ok((
                    Request::TrainingExamples(input),
                    TokenParts {
                        data_access,
                        federated_compute: None,
                        model_service: None,
                        user_data,
                    },
                ))
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish()
    }
}

fn run(
    worker: &dyn IsolatedWorker,
    request: Request,
    sink: &Arc<ResponseSink>,
) -> std::result::Result<(), IsolatedServiceError> {
    match request {
        Request::Execute(input) => worker.on_execute(input, Reply::new(sink.clone())),
        Request::DownloadCompleted(input) => {
            worker.on_download_completed(input, Reply::new(sink.clone()))
        }
        Request::Render(input) => worker.on_render(input, Reply::new(sink.clone())),
        Request::WebViewEvent(input) => worker.on_web_view_event(input, Reply::new(sink.clone())),
        Request::WebTrigger(input) => worker.on_web_trigger(input, Reply::new(sink.clone())),
        Request::TrainingExamples(input) => {
            worker.on_training_examples(input, Reply::new(sink.clone()))
        }
    }
}

fn require<T>(op: OperationCode, handle: Option<T>, capability: &'static str) -> Result<T> {
    handle.ok_or(DispatchError::MissingCapability { op, capability })
}

fn check(op: OperationCode, missing: Option<&'static str>) -> Result<()> {
    match missing {
        Some(field) => Err(DispatchError::MissingField { op, field }),
        None => Ok(()),
    }
}

fn decode<T: DeserializeOwned>(op: OperationCode, input: Option<Bytes>) -> Result<T> {
    let input = input.ok_or(DispatchError::MissingInput { op })?;
    serde_json::from_slice(&input).map_err(|e| DispatchError::Decode {
        op,
        source: CodecError::Decode {
            key: "input".to_string(),
            message: e.to_string(),
        },
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
