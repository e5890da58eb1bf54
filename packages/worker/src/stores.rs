//! Key/value facades over the host's remote and local data tables.
//!
//! Lookups send the key under [`keys::LOOKUP_KEYS`] and read the matching
//! entry of the map the host returns under [`keys::RESULT`]. Values are
//! opaque bytes.

use std::collections::BTreeMap;

use isolate_core::{keys, Bundle, CallError, DataAccessOp, Result, SyncAdapter};

/// Read access to a key/value table.
pub trait KeyValueStore {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Every key in the table.
    fn key_set(&self) -> Result<Vec<String>>;
}

/// Write access to a key/value table.
pub trait MutableKeyValueStore: KeyValueStore {
    /// Store `value` under `key`, returning the previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove `key`, returning the previous value.
    fn remove(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

fn lookup_params(key: &str) -> Result<Bundle> {
    Ok(Bundle::new().with(keys::LOOKUP_KEYS, &[key])?)
}

fn entry_for(
    adapter: &SyncAdapter,
    op: DataAccessOp,
    key: &str,
    params: Bundle,
) -> Result<Option<Vec<u8>>> {
    let mut map: BTreeMap<String, Vec<u8>> = adapter.call_for_result(op, params)?;
    Ok(map.remove(key))
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CallError::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

/// Read-only view of the remote (downloaded) data table.
#[derive(Debug, Clone)]
pub struct RemoteData {
    adapter: SyncAdapter,
}

impl RemoteData {
    pub fn new(adapter: SyncAdapter) -> Self {
        Self { adapter }
    }
}

impl KeyValueStore for RemoteData {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        entry_for(&self.adapter, DataAccessOp::RemoteLookup, key, lookup_params(key)?)
    }

    fn key_set(&self) -> Result<Vec<String>> {
        self.adapter
            .call_for_result(DataAccessOp::RemoteKeyset, Bundle::new())
    }
}

/// Read/write view of the worker-owned local data table.
#[derive(Debug, Clone)]
pub struct LocalData {
    adapter: SyncAdapter,
}

impl LocalData {
    pub fn new(adapter: SyncAdapter) -> Self {
        Self { adapter }
    }
}

impl KeyValueStore for LocalData {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        entry_for(&self.adapter, DataAccessOp::LocalLookup, key, lookup_params(key)?)
    }

    fn key_set(&self) -> Result<Vec<String>> {
        self.adapter
            .call_for_result(DataAccessOp::LocalKeyset, Bundle::new())
    }
}

impl MutableKeyValueStore for LocalData {
    fn put(&self, key: &str, value: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        let mut params = lookup_params(key)?;
        params.put_bytes(keys::VALUE, value.to_vec());
        entry_for(&self.adapter, DataAccessOp::LocalPut, key, params)
    }

    fn remove(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        entry_for(&self.adapter, DataAccessOp::LocalRemove, key, lookup_params(key)?)
    }
}
