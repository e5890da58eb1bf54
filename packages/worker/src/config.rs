//! Configuration for the worker dispatcher and its facades.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use isolate_core::records::{duration_millis, option_duration_millis};
use isolate_core::AdapterConfig;

/// Configuration for a [`crate::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Bound on blocking data-access calls. `None` waits indefinitely.
    #[serde(with = "option_duration_millis")]
    pub data_access_timeout: Option<Duration>,

    /// Bound on federated compute schedule/cancel calls.
    #[serde(with = "duration_millis")]
    pub federated_compute_timeout: Duration,

    /// Bound on model inference calls. `None` waits indefinitely.
    #[serde(with = "option_duration_millis")]
    pub inference_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            data_access_timeout: None,
            federated_compute_timeout: Duration::from_secs(30),
            inference_timeout: None,
        }
    }
}

impl WorkerConfig {
    pub fn with_data_access_timeout(mut self, timeout: Duration) -> Self {
        self.data_access_timeout = Some(timeout);
        self
    }

    pub fn with_federated_compute_timeout(mut self, timeout: Duration) -> Self {
        self.federated_compute_timeout = timeout;
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = Some(timeout);
        self
    }

    /// Adapter configuration for data-access facades.
    pub fn adapter(&self) -> AdapterConfig {
        AdapterConfig {
            wait_timeout: self.data_access_timeout,
        }
    }
}
