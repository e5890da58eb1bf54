//! Typed inputs and outputs of the worker operations.
//!
//! Inputs arrive JSON encoded in the dispatch input blob and are validated
//! before any handler runs. Outputs are encoded the same way into the
//! success payload of the response.

use serde::{Deserialize, Serialize};

use isolate_core::{EventLogRecord, ModelId, RequestLogRecord, Row, TrainingInterval};

use crate::stores::RemoteData;

/// Input of an execute request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteInput {
    /// Package of the calling application. Required.
    #[serde(default)]
    pub app_package_name: String,

    /// Application supplied parameters, passed through untouched.
    #[serde(default)]
    pub app_params: serde_json::Value,
}

impl ExecuteInput {
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        self.app_package_name
            .is_empty()
            .then_some("app_package_name")
    }
}

/// Which keys of the remote data table a render should draw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderingConfig {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteOutput {
    /// Rows to persist in the request log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_log_record: Option<RequestLogRecord>,

    /// Content to render in a follow-up render request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_config: Option<RenderingConfig>,

    /// Events to log against rows of `request_log_record`.
    #[serde(default)]
    pub events: Vec<EventLogRecord>,

    /// Opaque payload returned to the calling application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Vec<u8>>,
}

/// Input of a download-completed request.
///
/// Built from the downloaded-contents handle rather than the input blob.
#[derive(Debug, Clone)]
pub struct DownloadCompletedInput {
    pub downloaded_contents: RemoteData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadCompletedOutput {
    /// Downloaded keys to keep in the remote data table. Others are dropped.
    pub retained_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderInput {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Required.
    #[serde(default)]
    pub rendering_config: Option<RenderingConfig>,
}

impl RenderInput {
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        self.rendering_config.is_none().then_some("rendering_config")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Fully rendered content. Takes precedence over the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(default)]
    pub template_params: Row,
}

/// An event reported by the rendered content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebViewEventInput {
    /// The request whose rendered content raised the event.
    #[serde(default)]
    pub request_log_record: RequestLogRecord,

    /// Query parameters of the event URL.
    #[serde(default)]
    pub parameters: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebViewEventOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log_record: Option<EventLogRecord>,
}

/// A web trigger registered by an advertiser or publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebTriggerInput {
    /// Required.
    #[serde(default)]
    pub destination_url: String,

    #[serde(default)]
    pub app_package_name: String,

    #[serde(default)]
    pub data: Vec<u8>,
}

impl WebTriggerInput {
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        self.destination_url.is_empty().then_some("destination_url")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebTriggerOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_log_record: Option<RequestLogRecord>,

    #[serde(default)]
    pub event_log_records: Vec<EventLogRecord>,
}

/// Request for federated training examples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExamplesInput {
    /// Required.
    #[serde(default)]
    pub population_name: String,

    #[serde(default)]
    pub task_name: String,

    /// Where a previous batch left off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumption_token: Option<Vec<u8>>,
}

impl TrainingExamplesInput {
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        self.population_name.is_empty().then_some("population_name")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExampleRecord {
    pub training_example: Vec<u8>,
    pub resumption_token: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExamplesOutput {
    pub records: Vec<TrainingExampleRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
    Undefined,
}

/// Snapshot of device context captured when the request was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    /// Offset of the device time zone from UTC, in minutes.
    pub timezone_utc_offset_minutes: i32,
    pub orientation: Orientation,
    pub available_storage_bytes: u64,
    pub battery_percentage: u8,
    #[serde(default)]
    pub carrier: String,
    /// Installed applications, by package name.
    #[serde(default)]
    pub installed_apps: Vec<String>,
}

/// Population a federated compute job trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedComputeInput {
    pub population_name: String,
}

/// How often a scheduled federated compute job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub training_interval: TrainingInterval,
}

/// Input to a model inference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceInput {
    pub model_id: ModelId,

    /// Number of inputs in `inputs`. Must be positive.
    pub batch_size: u32,

    pub inputs: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutput {
    pub outputs: serde_json::Value,
}

/// Describes the event an event tracking URL reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventParams {
    pub event_type: i32,
    pub request_id: i64,
    pub row_index: usize,
    #[serde(default)]
    pub data: Row,
}
