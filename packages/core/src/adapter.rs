//! Blocking calls over one-shot asynchronous host services.
//!
//! [`SyncAdapter`] lets worker code call the data-access service as an
//! ordinary function ("look up this key", "list these keys") while the
//! transport underneath is callback based. Each call builds its own
//! completion slot, issues the request, and blocks the calling thread until
//! the host posts the single outcome.
//!
//! # Threading
//!
//! Calls block. They must not run on the thread that is expected to produce
//! the completion, and should not run on a dispatch thread shared with
//! unrelated requests. Offload the work to a worker thread first.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bundle::{keys, Bundle};
use crate::capability::DataAccessHandle;
use crate::codes::DataAccessOp;
use crate::error::{CallError, Result, TransportError};
use crate::logging::Logger;
use crate::records::option_duration_millis;
use crate::slot::{completion_slot, Completion, Outcome, SlotError};

/// How long a blocking call waits for its completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// `None` waits until the host completes or abandons the call.
    #[serde(with = "option_duration_millis")]
    pub wait_timeout: Option<Duration>,
}

impl AdapterConfig {
    /// Wait indefinitely.
    pub fn unbounded() -> Self {
        Self { wait_timeout: None }
    }

    /// Give up after `timeout` with [`CallError::TimedOut`].
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            wait_timeout: Some(timeout),
        }
    }
}

/// Issue one asynchronous call and block until its completion is posted.
///
/// `issue` receives the producer half of a fresh slot and must hand it to
/// the host service. Used by every blocking facade, not only data access.
pub fn await_completion<T>(
    call: &'static str,
    wait: Option<Duration>,
    issue: impl FnOnce(Completion<T>) -> std::result::Result<(), TransportError>,
) -> Result<T> {
    let (completion, reader) = completion_slot();
    issue(completion).map_err(|source| CallError::Transport { call, source })?;

    match reader.wait_for(wait) {
        Ok(Outcome::Success(value)) => Ok(value),
        Ok(Outcome::Error(code)) => Err(CallError::Remote { call, code }),
        Err(SlotError::Interrupted) => Err(CallError::Interrupted { call }),
        Err(SlotError::TimedOut) => Err(CallError::TimedOut {
            call,
            after: wait.unwrap_or_default(),
        }),
    }
}

/// Blocking front end for a data-access capability handle.
#[derive(Clone)]
pub struct SyncAdapter {
    service: DataAccessHandle,
    config: AdapterConfig,
    logger: Logger,
}

impl SyncAdapter {
    pub fn new(service: DataAccessHandle, config: AdapterConfig, logger: Logger) -> Self {
        Self {
            service,
            config,
            logger,
        }
    }

    pub fn service(&self) -> &DataAccessHandle {
        &self.service
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Issue `op` and block until the host completes it.
    pub fn call(&self, op: DataAccessOp, params: Bundle) -> Result<Bundle> {
        let service = &self.service;
        let result = await_completion(op.name(), self.config.wait_timeout, |completion| {
            service.on_request(op, params, completion)
        });
        if let Err(e) = &result {
            self.logger.error(format_args!("{} failed: {}", op, e));
        }
        result
    }

    /// Issue `op` and decode the [`keys::RESULT`] entry of the response.
    pub fn call_for_result<T: serde::de::DeserializeOwned>(
        &self,
        op: DataAccessOp,
        params: Bundle,
    ) -> Result<T> {
        let bundle = self.call(op, params)?;
        bundle.get(keys::RESULT)?.ok_or_else(|| {
            self.logger
                .error(format_args!("{}: no '{}' entry in result", op, keys::RESULT));
            CallError::MissingResult {
                call: op.name(),
                key: keys::RESULT,
            }
        })
    }
}

impl std::fmt::Debug for SyncAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("config", &self.config)
            .field("logger", &self.logger.tag())
            .finish()
    }
}
