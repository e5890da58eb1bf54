//! Blocking model inference.

use std::time::{Duration, Instant};

use isolate_core::{
    await_completion, keys, ApiName, Bundle, CallError, DataAccessOp, Logger, ModelServiceHandle,
    Result, StatusCode, SyncAdapter,
};

use crate::types::{InferenceInput, InferenceOutput};

/// Runs inference on models stored in the worker's data tables.
#[derive(Clone)]
pub struct ModelManager {
    data: SyncAdapter,
    service: ModelServiceHandle,
    timeout: Option<Duration>,
    logger: Logger,
}

impl ModelManager {
    pub fn new(
        data: SyncAdapter,
        service: ModelServiceHandle,
        timeout: Option<Duration>,
        logger: Logger,
    ) -> Self {
        Self {
            data,
            service,
            timeout,
            logger,
        }
    }

    /// Load the model named by `input.model_id` and run it over `input`.
    pub fn run(&self, input: &InferenceInput) -> Result<InferenceOutput> {
        if input.batch_size == 0 {
            return Err(CallError::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }

        let started = Instant::now();
        let result = self.load_and_run(input);
        let status = match &result {
            Ok(_) => StatusCode::Success.code(),
            Err(e) => {
                self.logger
                    .error(format_args!("inference on '{}' failed: {}", input.model_id.key, e));
                e.remote_code()
                    .unwrap_or_else(|| StatusCode::InternalError.code())
            }
        };
        self.data
            .service()
            .log_api_call_stats(ApiName::ModelManagerRun, started.elapsed(), status);
        result
    }

    fn load_and_run(&self, input: &InferenceInput) -> Result<InferenceOutput> {
        let lookup = Bundle::new().with(keys::VALUE, &input.model_id)?;
        let found = self.data.call(DataAccessOp::GetModel, lookup)?;
        let model = found.get_bytes(keys::RESULT).cloned().ok_or(CallError::MissingResult {
            call: DataAccessOp::GetModel.name(),
            key: keys::RESULT,
        })?;
        self.logger.debug(format_args!(
            "loaded model '{}' ({} bytes)",
            input.model_id.key,
            model.len()
        ));

        let mut params = Bundle::new().with(keys::INFERENCE_INPUT, input)?;
        params.put_bytes(keys::VALUE, model);

        let service = &self.service;
        let output = await_completion("model_manager_run", self.timeout, |completion| {
            service.run_inference(params, completion)
        })?;
        output.get(keys::RESULT)?.ok_or(CallError::MissingResult {
            call: "model_manager_run",
            key: keys::RESULT,
        })
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("timeout", &self.timeout)
            .finish()
    }
}
