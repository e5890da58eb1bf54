//! A model service backed by a plain function.

use std::sync::Arc;

use tokio::runtime::Handle;

use isolate_core::{Bundle, Completion, ModelService, Outcome, TransportError};

/// Runs inference by calling `F` with the request bundle.
///
/// `F` returns the result bundle or a failure code. With a runtime
/// attached, `F` runs on its blocking pool.
pub struct FnModelService<F> {
    infer: Arc<F>,
    runtime: Option<Handle>,
}

impl<F> FnModelService<F>
where
    F: Fn(Bundle) -> Result<Bundle, i32> + Send + Sync + 'static,
{
    pub fn new(infer: F) -> Self {
        Self {
            infer: Arc::new(infer),
            runtime: None,
        }
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

impl<F> ModelService for FnModelService<F>
where
    F: Fn(Bundle) -> Result<Bundle, i32> + Send + Sync + 'static,
{
    fn run_inference(
        &self,
        params: Bundle,
        completion: Completion<Bundle>,
    ) -> Result<(), TransportError> {
        let infer = self.infer.clone();
        let run = move || {
            let outcome = match infer(params) {
                Ok(result) => Outcome::Success(result),
                Err(code) => Outcome::Error(code),
            };
            completion.post(outcome);
        };
        match &self.runtime {
            Some(runtime) => {
                runtime.spawn_blocking(run);
            }
            None => run(),
        }
        Ok(())
    }
}

impl<F> std::fmt::Debug for FnModelService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModelService")
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
