//! Log record and scheduling types shared by workers and hosts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One row of a log record: column name to value.
pub type Row = BTreeMap<String, serde_json::Value>;

/// A request written to the REQUESTS table by an execute call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    /// Host-assigned id. Zero until the host persists the record.
    #[serde(default)]
    pub request_id: i64,

    /// Time the request was logged, in milliseconds since the epoch.
    #[serde(default)]
    pub time_millis: i64,

    pub rows: Vec<Row>,
}

impl RequestLogRecord {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            request_id: 0,
            time_millis: 0,
            rows,
        }
    }
}

/// An event written to the EVENTS table, associated with one request row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLogRecord {
    #[serde(default)]
    pub event_id: i64,

    /// Index of the row within the owning request this event refers to.
    pub row_index: usize,

    /// Application-defined event type. Must be positive.
    pub event_type: i32,

    #[serde(default)]
    pub time_millis: i64,

    #[serde(default)]
    pub data: Row,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_log_record: Option<RequestLogRecord>,
}

/// An event together with the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedLogRecord {
    pub request: RequestLogRecord,
    pub event: EventLogRecord,
}

/// How a training job repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    OneTime,
    Recurrent,
}

/// Minimum spacing and repetition of a federated training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingInterval {
    pub mode: SchedulingMode,
    #[serde(with = "duration_millis")]
    pub minimum_interval: Duration,
}

/// What the host scheduler receives for a schedule request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub population_name: String,
    pub training_interval: TrainingInterval,
}

/// Which table a model is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTable {
    RemoteData,
    LocalData,
}

/// Locates a model blob in one of the key/value tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelId {
    pub table: ModelTable,
    pub key: String,
}

/// `serde` adapter storing a `Duration` as whole milliseconds.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Like [`duration_millis`] for optional durations.
pub mod option_duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
