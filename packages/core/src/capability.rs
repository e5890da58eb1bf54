//! Capability handles: the host-owned services a worker may call.
//!
//! Each trait exposes an asynchronous, one-shot call contract. The caller
//! hands over a [`Completion`] together with the request; the host posts
//! exactly one outcome into it, from any thread, at any later time. An
//! `Err` return means the request never left the process and no outcome
//! will be posted.
//!
//! Implementations must tolerate concurrent, independent calls. Every call
//! carries its own completion, so no caller-side locking of the handle is
//! needed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::codes::DataAccessOp;
use crate::error::TransportError;
use crate::records::TrainingOptions;
use crate::slot::Completion;

/// Worker-facing APIs whose latency and outcome are reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiName {
    FederatedComputeSchedule,
    FederatedComputeCancel,
    ModelManagerRun,
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiName::FederatedComputeSchedule => "federated_compute_schedule",
            ApiName::FederatedComputeCancel => "federated_compute_cancel",
            ApiName::ModelManagerRun => "model_manager_run",
        };
        f.write_str(name)
    }
}

/// Host-side access to the key/value tables, event logs and event URLs.
pub trait DataAccessService: Send + Sync {
    /// Issue one data-access sub-operation.
    fn on_request(
        &self,
        op: DataAccessOp,
        params: Bundle,
        completion: Completion<Bundle>,
    ) -> Result<(), TransportError>;

    /// Record latency and outcome of a worker-facing API call.
    fn log_api_call_stats(&self, _api: ApiName, _latency: Duration, _status: i32) {}
}

/// Host-side scheduler for federated training jobs.
pub trait FederatedComputeService: Send + Sync {
    fn schedule(
        &self,
        options: TrainingOptions,
        completion: Completion<()>,
    ) -> Result<(), TransportError>;

    fn cancel(&self, population_name: &str, completion: Completion<()>)
        -> Result<(), TransportError>;
}

/// Host-side model inference runner.
pub trait ModelService: Send + Sync {
    /// Run inference. `params` carries the encoded inference input under
    /// [`crate::bundle::keys::INFERENCE_INPUT`]; the result bundle carries
    /// the output under [`crate::bundle::keys::RESULT`].
    fn run_inference(
        &self,
        params: Bundle,
        completion: Completion<Bundle>,
    ) -> Result<(), TransportError>;
}

pub type DataAccessHandle = Arc<dyn DataAccessService>;
pub type FederatedComputeHandle = Arc<dyn FederatedComputeService>;
pub type ModelServiceHandle = Arc<dyn ModelService>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{completion_slot, Outcome};

    struct Echo;

    impl DataAccessService for Echo {
        fn on_request(
            &self,
            _op: DataAccessOp,
            params: Bundle,
            completion: Completion<Bundle>,
        ) -> Result<(), TransportError> {
            completion.on_success(params);
            Ok(())
        }
    }

    #[test]
    fn handle_is_object_safe() {
        let handle: DataAccessHandle = Arc::new(Echo);
        let (completion, reader) = completion_slot();
        let mut params = Bundle::new();
        params.put_bytes("k", vec![9]);

        handle
            .on_request(DataAccessOp::RemoteKeyset, params.clone(), completion)
            .unwrap();
        assert_eq!(reader.wait(), Ok(Outcome::Success(params)));

        // Default stats hook is a no-op.
        handle.log_api_call_stats(ApiName::ModelManagerRun, Duration::from_millis(3), 0);
    }

    #[test]
    fn api_name_display() {
        assert_eq!(
            ApiName::FederatedComputeSchedule.to_string(),
            "federated_compute_schedule"
        );
    }
}
