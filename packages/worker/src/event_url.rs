//! Event tracking URLs minted by the host.

use url::Url;

use isolate_core::{keys, Bundle, CallError, DataAccessOp, Result, SyncAdapter};

use crate::types::EventParams;

/// Mints URLs that log an event when the rendered content fetches them.
#[derive(Debug, Clone)]
pub struct EventUrlProvider {
    adapter: SyncAdapter,
}

impl EventUrlProvider {
    pub fn new(adapter: SyncAdapter) -> Self {
        Self { adapter }
    }

    /// A URL that logs `params` and answers with `response` of type `mime_type`.
    pub fn create_event_tracking_url_with_response(
        &self,
        params: &EventParams,
        response: &[u8],
        mime_type: &str,
    ) -> Result<Url> {
        let mut bundle = event_params(params)?;
        bundle.put_bytes(keys::RESPONSE_DATA, response.to_vec());
        bundle.put(keys::MIME_TYPE, mime_type)?;
        self.mint(bundle)
    }

    /// A URL that logs `params` and redirects to `destination`.
    pub fn create_event_tracking_url_with_redirect(
        &self,
        params: &EventParams,
        destination: &Url,
    ) -> Result<Url> {
        let bundle = event_params(params)?.with(keys::DESTINATION_URL, destination.as_str())?;
        self.mint(bundle)
    }

    fn mint(&self, params: Bundle) -> Result<Url> {
        let raw: String = self
            .adapter
            .call_for_result(DataAccessOp::GetEventUrl, params)?;
        Url::parse(&raw).map_err(|e| {
            CallError::InvalidArgument(format!("host returned malformed event url: {}", e))
        })
    }
}

fn event_params(params: &EventParams) -> Result<Bundle> {
    if params.event_type <= 0 {
        return Err(CallError::InvalidArgument(format!(
            "event type must be positive: {}",
            params.event_type
        )));
    }
    Ok(Bundle::new().with(keys::EVENT_PARAMS, params)?)
}
