//! Minting and reading event tracking URLs.
//!
//! The event description travels inside the URL itself: a JSON payload,
//! base64 encoded into the `e` query parameter of the host's base URL.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use isolate_core::{data_access_status, keys, Bundle};

const PAYLOAD_PARAM: &str = "e";

/// What an event tracking URL reports when fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventUrlPayload {
    /// Event description exactly as the worker encoded it.
    pub event_params: serde_json::Value,

    /// Body to answer with, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Where to redirect instead of answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
}

impl EventUrlPayload {
    /// The decoded response body, if any.
    pub fn response_bytes(&self) -> Option<Vec<u8>> {
        self.response_data
            .as_ref()
            .and_then(|data| URL_SAFE_NO_PAD.decode(data).ok())
    }
}

/// Build the payload described by a `GET_EVENT_URL` request.
pub(crate) fn payload_from(params: &Bundle) -> Result<EventUrlPayload, i32> {
    let failure = data_access_status::DATA_ACCESS_FAILURE;
    let event_params: serde_json::Value = params
        .get(keys::EVENT_PARAMS)
        .map_err(|_| failure)?
        .ok_or(failure)?;

    let destination_url: Option<String> = params.get(keys::DESTINATION_URL).map_err(|_| failure)?;
    let mime_type: Option<String> = params.get(keys::MIME_TYPE).map_err(|_| failure)?;
    let response_data = params
        .get_bytes(keys::RESPONSE_DATA)
        .map(|data| URL_SAFE_NO_PAD.encode(data));

    match (&destination_url, &response_data) {
        (Some(_), None) | (None, Some(_)) => Ok(EventUrlPayload {
            event_params,
            response_data,
            mime_type,
            destination_url,
        }),
        _ => Err(failure),
    }
}

/// Encode `payload` into a URL under `base`.
pub fn mint(base: &Url, payload: &EventUrlPayload) -> Result<Url, serde_json::Error> {
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(PAYLOAD_PARAM, &encoded);
    Ok(url)
}

/// Recover the payload of a URL produced by [`mint`].
pub fn decode(url: &Url) -> Option<EventUrlPayload> {
    let (_, encoded) = url.query_pairs().find(|(name, _)| name == PAYLOAD_PARAM)?;
    let raw = URL_SAFE_NO_PAD.decode(encoded.as_bytes()).ok()?;
    serde_json::from_slice(&raw).ok()
}
