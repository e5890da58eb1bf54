//! Per-request capabilities handed to worker code.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use isolate_core::{
    CallError, DataAccessHandle, FederatedComputeHandle, Logger, ModelServiceHandle,
    OperationCode, Result, SyncAdapter,
};

use crate::config::WorkerConfig;
use crate::event_url::EventUrlProvider;
use crate::log_reader::LogReader;
use crate::model::ModelManager;
use crate::scheduler::FederatedComputeScheduler;
use crate::stores::{LocalData, RemoteData};
use crate::types::UserData;

/// Unique id of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable bundle of the capabilities one request may use.
///
/// Created by the dispatcher for a single request and never reused.
/// Cloning shares the same token. Worker code should not keep it beyond
/// the request.
#[derive(Clone)]
pub struct RequestToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    id: RequestId,
    operation: OperationCode,
    started: Instant,
    data_access: DataAccessHandle,
    federated_compute: Option<FederatedComputeHandle>,
    model_service: Option<ModelServiceHandle>,
    user_data: Option<UserData>,
    config: WorkerConfig,
    logger: Logger,
}

/// Capabilities a token is built from.
pub(crate) struct TokenParts {
    pub data_access: DataAccessHandle,
    pub federated_compute: Option<FederatedComputeHandle>,
    pub model_service: Option<ModelServiceHandle>,
    pub user_data: Option<UserData>,
}

impl RequestToken {
    pub(crate) fn new(
        operation: OperationCode,
        parts: TokenParts,
        config: WorkerConfig,
        logger: Logger,
    ) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id: RequestId::new(),
                operation,
                started: Instant::now(),
                data_access: parts.data_access,
                federated_compute: parts.federated_compute,
                model_service: parts.model_service,
                user_data: parts.user_data,
                config,
                logger,
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    /// The operation this token was minted for.
    pub fn operation(&self) -> OperationCode {
        self.inner.operation
    }

    pub fn started(&self) -> Instant {
        self.inner.started
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.inner.user_data.as_ref()
    }

    pub fn has_federated_compute(&self) -> bool {
        self.inner.federated_compute.is_some()
    }

    pub fn has_model_service(&self) -> bool {
        self.inner.model_service.is_some()
    }

    fn adapter(&self, tag: &'static str) -> SyncAdapter {
        SyncAdapter::new(
            self.inner.data_access.clone(),
            self.inner.config.adapter(),
            self.inner.logger.child(tag),
        )
    }

    /// Read-only view of the remote data table.
    pub fn remote_data(&self) -> RemoteData {
        RemoteData::new(self.adapter("remote_data"))
    }

    /// Read/write view of the local data table.
    pub fn local_data(&self) -> LocalData {
        LocalData::new(self.adapter("local_data"))
    }

    pub fn log_reader(&self) -> LogReader {
        LogReader::new(self.adapter("log_reader"))
    }

    pub fn event_url_provider(&self) -> EventUrlProvider {
        EventUrlProvider::new(self.adapter("event_url"))
    }

    /// Scheduler for federated compute jobs.
    ///
    /// Fails with [`CallError::Unavailable`] for operations that never
    /// schedule background work, such as render.
    pub fn federated_compute_scheduler(&self) -> Result<FederatedComputeScheduler> {
        let service = self
            .inner
            .federated_compute
            .clone()
            .ok_or(CallError::Unavailable("federated compute scheduler"))?;
        Ok(FederatedComputeScheduler::new(
            service,
            self.inner.data_access.clone(),
            self.inner.config.federated_compute_timeout,
            self.inner.logger.child("federated_compute"),
        ))
    }

    pub fn model_manager(&self) -> Result<ModelManager> {
        let service = self
            .inner
            .model_service
            .clone()
            .ok_or(CallError::Unavailable("model manager"))?;
        Ok(ModelManager::new(
            self.adapter("model_manager"),
            service,
            self.inner.config.inference_timeout,
            self.inner.logger.child("model_manager"),
        ))
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("id", &self.inner.id)
            .field("operation", &self.inner.operation)
            .field("federated_compute", &self.has_federated_compute())
            .field("model_service", &self.has_model_service())
            .field("user_data", &self.inner.user_data)
            .finish()
    }
}
