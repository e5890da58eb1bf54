//! An in-memory data access service.
//!
//! Serves every data-access sub-operation from tables held in memory:
//! remote data, local data, the request and event logs, and event URL
//! minting. Requests complete inline, or from a task on a `tokio` runtime
//! when one is attached, so callers exercise the same cross-thread
//! handoff a real host would.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use url::Url;

use isolate_core::{
    data_access_status, keys, ApiName, Bundle, Completion, DataAccessOp, DataAccessService,
    EventLogRecord, JoinedLogRecord, Logger, ModelId, ModelTable, Outcome, RequestLogRecord,
    TransportError,
};

use crate::event_url;

/// One latency report received through
/// [`DataAccessService::log_api_call_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallStat {
    pub api: ApiName,
    pub latency: Duration,
    pub status: i32,
}

/// Which sub-operations a service answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Full,
    /// Only remote lookups and key sets, as for freshly downloaded contents.
    RemoteOnly,
}

#[derive(Debug, Default)]
struct Tables {
    remote: BTreeMap<String, Vec<u8>>,
    local: BTreeMap<String, Vec<u8>>,
    local_read_only: bool,
    requests: BTreeMap<i64, RequestLogRecord>,
    /// Event id to (owning request id, event).
    events: BTreeMap<i64, (i64, EventLogRecord)>,
    next_id: i64,
    event_base: Option<Url>,
    failing_ops: BTreeMap<DataAccessOp, i32>,
    failing_keys: BTreeMap<String, i32>,
    received: Vec<DataAccessOp>,
    stats: Vec<ApiCallStat>,
}

struct Shared {
    tables: Mutex<Tables>,
    scope: Scope,
}

/// Host-side data access backed by in-memory tables.
///
/// Clones share the same tables.
#[derive(Clone)]
pub struct InMemoryDataAccess {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
    logger: Logger,
}

const DEFAULT_EVENT_BASE: &str = "https://localhost/event";

impl InMemoryDataAccess {
    pub fn new() -> Self {
        Self::scoped(Scope::Full, BTreeMap::new())
    }

    /// A service answering only remote lookups over `contents`.
    pub fn downloaded_contents(contents: BTreeMap<String, Vec<u8>>) -> Self {
        Self::scoped(Scope::RemoteOnly, contents)
    }

    fn scoped(scope: Scope, remote: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables {
                    remote,
                    next_id: 1,
                    ..Default::default()
                }),
                scope,
            }),
            runtime: None,
            logger: Logger::new("host_data_access"),
        }
    }

    /// Complete requests from tasks spawned on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Mint event URLs under `base` instead of the default.
    pub fn with_event_base(self, base: Url) -> Self {
        self.tables().event_base = Some(base);
        self
    }

    /// Reject writes to the local table.
    pub fn read_only_local(self) -> Self {
        self.tables().local_read_only = true;
        self
    }

    pub fn insert_remote(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.tables().remote.insert(key.into(), value.into());
    }

    pub fn insert_local(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.tables().local.insert(key.into(), value.into());
    }

    pub fn local(&self, key: &str) -> Option<Vec<u8>> {
        self.tables().local.get(key).cloned()
    }

    /// Persist a request, assigning its id. Returns the id.
    pub fn log_request(&self, mut record: RequestLogRecord) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id;
        tables.next_id += 1;
        record.request_id = id;
        tables.requests.insert(id, record);
        id
    }

    /// Persist an event against `request_id`. Returns the event id, or
    /// `None` if the request is unknown or the event refers to a missing row.
    pub fn log_event(&self, request_id: i64, mut event: EventLogRecord) -> Option<i64> {
        let mut tables = self.tables();
        let rows = tables.requests.get(&request_id)?.rows.len();
        if event.row_index >= rows || event.event_type <= 0 {
            return None;
        }
        let id = tables.next_id;
        tables.next_id += 1;
        event.event_id = id;
        tables.events.insert(id, (request_id, event));
        Some(id)
    }

    /// Answer every `op` request with `code`.
    pub fn fail_op(&self, op: DataAccessOp, code: i32) {
        self.tables().failing_ops.insert(op, code);
    }

    /// Answer any lookup of `key` with `code`.
    pub fn fail_key(&self, key: impl Into<String>, code: i32) {
        self.tables().failing_keys.insert(key.into(), code);
    }

    /// Sub-operations received so far, in arrival order.
    pub fn received(&self) -> Vec<DataAccessOp> {
        self.tables().received.clone()
    }

    pub fn api_call_stats(&self) -> Vec<ApiCallStat> {
        self.tables().stats.clone()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock(&self.shared.tables)
    }
}

impl Default for InMemoryDataAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataAccess")
            .field("scope", &self.shared.scope)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DataAccessService for InMemoryDataAccess {
    fn on_request(
        &self,
        op: DataAccessOp,
        params: Bundle,
        completion: Completion<Bundle>,
    ) -> Result<(), TransportError> {
        let shared = self.shared.clone();
        let logger = self.logger.clone();
        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    completion.post(shared.answer(op, params, &logger));
                });
            }
            None => completion.post(shared.answer(op, params, &logger)),
        }
        Ok(())
    }

    fn log_api_call_stats(&self, api: ApiName, latency: Duration, status: i32) {
        self.tables().stats.push(ApiCallStat {
            api,
            latency,
            status,
        });
    }
}

impl Shared {
    fn answer(&self, op: DataAccessOp, params: Bundle, logger: &Logger) -> Outcome<Bundle> {
        match self.serve(op, &params) {
            Ok(result) => Outcome::Success(result),
            Err(code) => {
                logger.debug(format_args!("{} failed with {}", op, code));
                Outcome::Error(code)
            }
        }
    }

    fn serve(&self, op: DataAccessOp, params: &Bundle) -> Result<Bundle, i32> {
        let mut tables = lock(&self.tables);
        tables.received.push(op);
        if let Some(code) = tables.failing_ops.get(&op) {
            return Err(*code);
        }
        if self.scope == Scope::RemoteOnly
            && !matches!(op, DataAccessOp::RemoteLookup | DataAccessOp::RemoteKeyset)
        {
            return Err(data_access_status::UNSUPPORTED_OP);
        }

        match op {
            DataAccessOp::RemoteLookup => {
                let wanted = lookup_keys(params)?;
                tables.check_keys(&wanted)?;
                found(&tables.remote, &wanted)
            }
            DataAccessOp::RemoteKeyset => result(&tables.remote.keys().collect::<Vec<_>>()),
            DataAccessOp::LocalLookup => {
                let wanted = lookup_keys(params)?;
                tables.check_keys(&wanted)?;
                found(&tables.local, &wanted)
            }
            DataAccessOp::LocalKeyset => result(&tables.local.keys().collect::<Vec<_>>()),
            DataAccessOp::LocalPut => {
                let key = single_key(params)?;
                tables.check_write()?;
                let value = params
                    .get_bytes(keys::VALUE)
                    .ok_or(data_access_status::DATA_ACCESS_FAILURE)?
                    .to_vec();
                let previous = tables.local.insert(key.clone(), value);
                previous_entry(key, previous)
            }
            DataAccessOp::LocalRemove => {
                let key = single_key(params)?;
                tables.check_write()?;
                let previous = tables.local.remove(&key);
                previous_entry(key, previous)
            }
            DataAccessOp::GetEventUrl => {
                let payload = event_url::payload_from(params)?;
                let base = match &tables.event_base {
                    Some(base) => base.clone(),
                    None => Url::parse(DEFAULT_EVENT_BASE)
                        .map_err(|_| data_access_status::DATA_ACCESS_FAILURE)?,
                };
                let url = event_url::mint(&base, &payload)
                    .map_err(|_| data_access_status::DATA_ACCESS_FAILURE)?;
                result(url.as_str())
            }
            DataAccessOp::GetRequestIds => {
                let (start, end) = time_range(params)?;
                let ids: Vec<i64> = tables
                    .requests
                    .values()
                    .filter(|r| (start..end).contains(&r.time_millis))
                    .map(|r| r.request_id)
                    .collect();
                result(&ids)
            }
            DataAccessOp::GetEventIds => {
                let (start, end) = time_range(params)?;
                let ids: Vec<i64> = tables
                    .events
                    .values()
                    .filter(|(_, e)| (start..end).contains(&e.time_millis))
                    .map(|(_, e)| e.event_id)
                    .collect();
                result(&ids)
            }
            DataAccessOp::GetEventIdsForRequest => {
                let request_id: i64 = value(params)?;
                let ids: Vec<i64> = tables
                    .events
                    .values()
                    .filter(|(owner, _)| *owner == request_id)
                    .map(|(_, e)| e.event_id)
                    .collect();
                result(&ids)
            }
            DataAccessOp::GetRequestLogRecord => {
                let request_id: i64 = value(params)?;
                match tables.requests.get(&request_id) {
                    Some(record) => result(record),
                    None => Ok(Bundle::new()),
                }
            }
            DataAccessOp::GetJoinedLogRecord => {
                let event_id: i64 = value(params)?;
                let joined = tables.events.get(&event_id).and_then(|(owner, event)| {
                    tables.requests.get(owner).map(|request| JoinedLogRecord {
                        request: request.clone(),
                        event: event.clone(),
                    })
                });
                match joined {
                    Some(joined) => result(&joined),
                    None => Ok(Bundle::new()),
                }
            }
            DataAccessOp::GetModel => {
                let id: ModelId = value(params)?;
                let table = match id.table {
                    ModelTable::RemoteData => &tables.remote,
                    ModelTable::LocalData => &tables.local,
                };
                let model = table
                    .get(&id.key)
                    .ok_or(data_access_status::KEY_NOT_FOUND)?;
                let mut bundle = Bundle::new();
                bundle.put_bytes(keys::RESULT, model.clone());
                Ok(bundle)
            }
        }
    }
}

impl Tables {
    fn check_keys(&self, wanted: &[String]) -> Result<(), i32> {
        match wanted.iter().find_map(|key| self.failing_keys.get(key)) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), i32> {
        if self.local_read_only {
            Err(data_access_status::LOCAL_DATA_READ_ONLY)
        } else {
            Ok(())
        }
    }
}

fn result<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bundle, i32> {
    Bundle::new()
        .with(keys::RESULT, value)
        .map_err(|_| data_access_status::DATA_ACCESS_FAILURE)
}

fn value<T: serde::de::DeserializeOwned>(params: &Bundle) -> Result<T, i32> {
    params
        .get(keys::VALUE)
        .ok()
        .flatten()
        .ok_or(data_access_status::DATA_ACCESS_FAILURE)
}

fn lookup_keys(params: &Bundle) -> Result<Vec<String>, i32> {
    params
        .get(keys::LOOKUP_KEYS)
        .ok()
        .flatten()
        .ok_or(data_access_status::DATA_ACCESS_FAILURE)
}

fn single_key(params: &Bundle) -> Result<String, i32> {
    match <[String; 1]>::try_from(lookup_keys(params)?) {
        Ok([key]) => Ok(key),
        Err(_) => Err(data_access_status::DATA_ACCESS_FAILURE),
    }
}

fn found(table: &BTreeMap<String, Vec<u8>>, wanted: &[String]) -> Result<Bundle, i32> {
    let entries: BTreeMap<&String, &Vec<u8>> = wanted
        .iter()
        .filter_map(|key| table.get_key_value(key))
        .collect();
    result(&entries)
}

fn previous_entry(key: String, previous: Option<Vec<u8>>) -> Result<Bundle, i32> {
    let entries: BTreeMap<String, Vec<u8>> = previous.map(|p| (key, p)).into_iter().collect();
    result(&entries)
}

fn time_range(params: &Bundle) -> Result<(i64, i64), i32> {
    let (start, end): (i64, i64) = params
        .get(keys::VALUE)
        .ok()
        .flatten()
        .ok_or(data_access_status::TIMESTAMPS_INVALID)?;
    if start < 0 || end <= start {
        return Err(data_access_status::TIMESTAMPS_INVALID);
    }
    Ok((start, end))
}
