//! The parameter/result blob exchanged with host services.
//!
//! A [`Bundle`] is an ordered map from string keys to opaque encoded values.
//! Structured values go through `serde_json`; raw payloads are stored as-is
//! so that byte values survive a round trip untouched.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Well-known bundle keys.
pub mod keys {
    pub const LOOKUP_KEYS: &str = "lookup_keys";
    pub const VALUE: &str = "value";
    pub const RESULT: &str = "result";
    pub const EVENT_PARAMS: &str = "event_params";
    pub const RESPONSE_DATA: &str = "response_data";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DESTINATION_URL: &str = "destination_url";
    pub const INFERENCE_INPUT: &str = "inference_input";
}

/// Errors from encoding or decoding a bundle entry.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode '{key}': {message}")]
    Encode { key: String, message: String },

    #[error("failed to decode '{key}': {message}")]
    Decode { key: String, message: String },
}

/// Ordered key/value blob passed across the process boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    entries: BTreeMap<String, Bytes>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `value` and store it under `key`, replacing any previous entry.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), CodecError> {
        let encoded = serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.entries.insert(key.to_string(), Bytes::from(encoded));
        Ok(())
    }

    /// Builder form of [`Bundle::put`].
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Result<Self, CodecError> {
        self.put(key, value)?;
        Ok(self)
    }

    /// Decode the entry under `key`. Missing keys yield `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CodecError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| CodecError::Decode {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Store a raw payload under `key` without encoding it.
    pub fn put_bytes(&mut self, key: &str, value: impl Into<Bytes>) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Raw payload stored under `key`.
    pub fn get_bytes(&self, key: &str) -> Option<&Bytes> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Bytes> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
