//! Blocking reads of the host's request and event logs.

use isolate_core::{
    keys, Bundle, CallError, DataAccessOp, JoinedLogRecord, RequestLogRecord, Result, SyncAdapter,
};

/// Reads request and event log records written for this worker.
///
/// Time ranges are half open, in milliseconds since the epoch.
#[derive(Debug, Clone)]
pub struct LogReader {
    adapter: SyncAdapter,
}

impl LogReader {
    pub fn new(adapter: SyncAdapter) -> Self {
        Self { adapter }
    }

    /// Ids of requests logged in `[start, end)`.
    pub fn request_ids(&self, start: i64, end: i64) -> Result<Vec<i64>> {
        let params = range_params(start, end)?;
        self.adapter
            .call_for_result(DataAccessOp::GetRequestIds, params)
    }

    /// Ids of events logged in `[start, end)`.
    pub fn event_ids(&self, start: i64, end: i64) -> Result<Vec<i64>> {
        let params = range_params(start, end)?;
        self.adapter.call_for_result(DataAccessOp::GetEventIds, params)
    }

    /// Ids of events attached to `request_id`.
    pub fn event_ids_for_request(&self, request_id: i64) -> Result<Vec<i64>> {
        let params = Bundle::new().with(keys::VALUE, &request_id)?;
        self.adapter
            .call_for_result(DataAccessOp::GetEventIdsForRequest, params)
    }

    pub fn request_log_record(&self, request_id: i64) -> Result<Option<RequestLogRecord>> {
        let params = Bundle::new().with(keys::VALUE, &request_id)?;
        let result = self.adapter.call(DataAccessOp::GetRequestLogRecord, params)?;
        Ok(result.get(keys::RESULT)?)
    }

    /// The event `event_id` joined with the request that produced it.
    pub fn joined_log_record(&self, event_id: i64) -> Result<Option<JoinedLogRecord>> {
        let params = Bundle::new().with(keys::VALUE, &event_id)?;
        let result = self.adapter.call(DataAccessOp::GetJoinedLogRecord, params)?;
        Ok(result.get(keys::RESULT)?)
    }

    /// Every request logged in `[start, end)`.
    pub fn requests(&self, start: i64, end: i64) -> Result<Vec<RequestLogRecord>> {
        let mut records = Vec::new();
        for id in self.request_ids(start, end)? {
            if let Some(record) = self.request_log_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Every event logged in `[start, end)`, joined with its request.
    pub fn joined_events(&self, start: i64, end: i64) -> Result<Vec<JoinedLogRecord>> {
        let mut records = Vec::new();
        for id in self.event_ids(start, end)? {
            if let Some(record) = self.joined_log_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn range_params(start: i64, end: i64) -> Result<Bundle> {
    if start < 0 {
        return Err(CallError::InvalidArgument(format!(
            "start time must not be negative: {}",
            start
        )));
    }
    if end <= start {
        return Err(CallError::InvalidArgument(format!(
            "end time {} must be after start time {}",
            end, start
        )));
    }
    Ok(Bundle::new().with(keys::VALUE, &(start, end))?)
}
