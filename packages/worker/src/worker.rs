//! Traits implemented by worker code.

use crate::error::IsolatedServiceError;
use crate::response::Reply;
use crate::token::RequestToken;
use crate::types::{
    DownloadCompletedInput, DownloadCompletedOutput, ExecuteInput, ExecuteOutput, RenderInput,
    RenderOutput, TrainingExamplesInput, TrainingExamplesOutput, WebTriggerInput,
    WebTriggerOutput, WebViewEventInput, WebViewEventOutput,
};

/// Entry point of a worker: builds a handler for each request.
pub trait IsolatedService: Send + Sync {
    /// Create the worker that will handle the request `token` was minted for.
    fn on_request(&self, token: &RequestToken) -> Box<dyn IsolatedWorker>;
}

/// Typed handlers, one per operation.
///
/// Each handler receives its validated input and a [`Reply`]. It runs on
/// the dispatching thread, so real work should move to another thread
/// together with the reply. Returning `Err`, or panicking, answers the
/// request with `INTERNAL_ERROR` unless the reply was already sent.
///
/// Every default implementation answers with no result.
#[allow(unused_variables)]
pub trait IsolatedWorker: Send {
    fn on_execute(
        &self,
        input: ExecuteInput,
        reply: Reply<ExecuteOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }

    fn on_download_completed(
        &self,
        input: DownloadCompletedInput,
        reply: Reply<DownloadCompletedOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }

    fn on_render(
        &self,
        input: RenderInput,
        reply: Reply<RenderOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }

    fn on_web_view_event(
        &self,
        input: WebViewEventInput,
        reply: Reply<WebViewEventOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }

    fn on_web_trigger(
        &self,
        input: WebTriggerInput,
        reply: Reply<WebTriggerOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }

    fn on_training_examples(
        &self,
        input: TrainingExamplesInput,
        reply: Reply<TrainingExamplesOutput>,
    ) -> Result<(), IsolatedServiceError> {
        reply.send_none();
        Ok(())
    }
}

impl<F> IsolatedService for F
where
    F: Fn(&RequestToken) -> Box<dyn IsolatedWorker> + Send + Sync,
{
    fn on_request(&self, token: &RequestToken) -> Box<dyn IsolatedWorker> {
        self(token)
    }
}
