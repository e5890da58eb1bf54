use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use isolate_core::{
    Bundle, Bytes, DataAccessHandle, FederatedComputeHandle, Logger, ModelServiceHandle,
    OperationCode, StatusCode, TransportError,
};
use isolate_host::{FnModelService, InMemoryDataAccess, RecordingScheduler};
use isolate_worker::{
    CalleeMetadata, DispatchError, Dispatcher, DownloadCompletedInput, DownloadCompletedOutput,
    ExecuteInput, ExecuteOutput, IsolatedServiceCallback, IsolatedServiceError, IsolatedWorker,
    Orientation, RenderInput, RenderOutput, RenderingConfig, Reply, RequestToken, ServiceParams,
    ServiceResponse, TrainingExamplesInput, TrainingExamplesOutput, UserData,
    WebTriggerInput, WebTriggerOutput, WebViewEventInput, WebViewEventOutput, WorkerConfig,
};

/// Collects every response delivered for one request.
#[derive(Clone, Default)]
struct Responses(Arc<Mutex<Vec<ServiceResponse>>>);

impl Responses {
    fn callback(&self) -> Box<dyn IsolatedServiceCallback> {
        Box::new(Recorder(self.clone()))
    }

    fn all(&self) -> Vec<ServiceResponse> {
        self.0.lock().unwrap().clone()
    }

    fn single(&self) -> ServiceResponse {
        let all = self.all();
        assert_eq!(all.len(), 1, "expected exactly one response, got {:?}", all);
        all.into_iter().next().unwrap()
    }
}

struct Recorder(Responses);

impl IsolatedServiceCallback for Recorder {
    fn on_success(
        self: Box<Self>,
        result: Bytes,
        metadata: CalleeMetadata,
    ) -> Result<(), TransportError> {
        (self.0).0.lock().unwrap().push(ServiceResponse::Success { result, metadata });
        Ok(())
    }

    fn on_error(self: Box<Self>, code: StatusCode) -> Result<(), TransportError> {
        (self.0).0.lock().unwrap().push(ServiceResponse::Error { code });
        Ok(())
    }
}

/// Host capabilities shared by the tests.
struct Host {
    data: DataAccessHandle,
    downloads: DataAccessHandle,
    scheduler: FederatedComputeHandle,
    model: ModelServiceHandle,
}

impl Host {
    fn new() -> Self {
        Self {
            data: Arc::new(InMemoryDataAccess::new()),
            downloads: Arc::new(InMemoryDataAccess::downloaded_contents(Default::default())),
            scheduler: Arc::new(RecordingScheduler::new()),
            model: Arc::new(FnModelService::new(|_: Bundle| Ok(Bundle::new()))),
        }
    }

    /// A valid request for `op`, leaving out the capability named `without`.
    fn params(&self, op: OperationCode, without: Option<&str>) -> ServiceParams {
        let keep = |name: &str| without != Some(name);
        let mut params = ServiceParams::new();
        if keep("data_access") {
            params = params.with_data_access(self.data.clone());
        }
        if keep("downloaded_contents") {
            params = params.with_downloaded_contents(self.downloads.clone());
        }
        if keep("federated_compute") {
            params = params.with_federated_compute(self.scheduler.clone());
        }
        if keep("model_service") {
            params = params.with_model_service(self.model.clone());
        }
        params = params.with_user_data(user_data());
        let params = match op {
            OperationCode::Execute => params.with_encoded_input(&ExecuteInput {
                app_package_name: "com.example.app".to_string(),
                ..Default::default()
            }),
            OperationCode::DownloadCompleted => Ok(params),
            OperationCode::Render => params.with_encoded_input(&RenderInput {
                width: 320,
                height: 50,
                rendering_config: Some(RenderingConfig {
                    keys: vec!["banner".to_string()],
                }),
            }),
            OperationCode::WebViewEvent => params.with_encoded_input(&WebViewEventInput::default()),
            OperationCode::WebTrigger => params.with_encoded_input(&WebTriggerInput {
                destination_url: "https://example.com/checkout".to_string(),
                ..Default::default()
            }),
            OperationCode::TrainingExample => {
                params.with_encoded_input(&TrainingExamplesInput {
                    population_name: "population".to_string(),
                    ..Default::default()
                })
            }
        };
        params.unwrap()
    }
}

fn user_data() -> UserData {
    UserData {
        timezone_utc_offset_minutes: -300,
        orientation: Orientation::Portrait,
        available_storage_bytes: 1 << 30,
        battery_percentage: 80,
        carrier: "carrier".to_string(),
        installed_apps: vec!["com.example.app".to_string()],
    }
}

fn required_capabilities(op: OperationCode) -> &'static [&'static str] {
    match op {
        OperationCode::Execute => &["data_access", "federated_compute", "model_service"],
        OperationCode::DownloadCompleted => &[
            "data_access",
            "federated_compute",
            "model_service",
            "downloaded_contents",
        ],
        OperationCode::Render => &["data_access"],
        OperationCode::WebViewEvent | OperationCode::WebTrigger => {
            &["data_access", "model_service"]
        }
        OperationCode::TrainingExample => &["data_access"],
    }
}

/// What the counting worker saw.
#[derive(Clone, Default)]
struct Seen {
    handled: Arc<Mutex<Vec<OperationCode>>>,
    tokens: Arc<Mutex<Vec<RequestToken>>>,
}

/// Answers every operation with a default output and records the call.
struct Counting {
    seen: Seen,
    operation: OperationCode,
}

impl Counting {
    fn hit(&self) {
        self.seen.handled.lock().unwrap().push(self.operation);
    }
}

impl IsolatedWorker for Counting {
    fn on_execute(
        &self,
        _input: ExecuteInput,
        reply: Reply<ExecuteOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(ExecuteOutput::default());
        Ok(())
    }

    fn on_download_completed(
        &self,
        _input: DownloadCompletedInput,
        reply: Reply<DownloadCompletedOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(DownloadCompletedOutput::default());
        Ok(())
    }

    fn on_render(
        &self,
        _input: RenderInput,
        reply: Reply<RenderOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(RenderOutput::default());
        Ok(())
    }

    fn on_web_view_event(
        &self,
        _input: WebViewEventInput,
        reply: Reply<WebViewEventOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(WebViewEventOutput::default());
        Ok(())
    }

    fn on_web_trigger(
        &self,
        _input: WebTriggerInput,
        reply: Reply<WebTriggerOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(WebTriggerOutput::default());
        Ok(())
    }

    fn on_training_examples(
        &self,
        _input: TrainingExamplesInput,
        reply: Reply<TrainingExamplesOutput>,
    ) -> Result<(), IsolatedServiceError> {
        self.hit();
        reply.send(TrainingExamplesOutput::default());
        Ok(())
    }
}

fn counting_dispatcher(seen: &Seen) -> Dispatcher {
    let seen = seen.clone();
    let service = move |token: &RequestToken| -> Box<dyn IsolatedWorker> {
        seen.tokens.lock().unwrap().push(token.clone());
        Box::new(Counting {
            seen: seen.clone(),
            operation: token.operation(),
        })
    };
    Dispatcher::new(Arc::new(service), WorkerConfig::default(), Logger::disabled())
}

/// Uses every default handler.
struct Silent;

impl IsolatedWorker for Silent {}

fn dispatcher_for<W, F>(make: F) -> Dispatcher
where
    W: IsolatedWorker + 'static,
    F: Fn(&RequestToken) -> W + Send + Sync + 'static,
{
    let service = move |token: &RequestToken| -> Box<dyn IsolatedWorker> { Box::new(make(token)) };
    Dispatcher::new(Arc::new(service), WorkerConfig::default(), Logger::disabled())
}

#[test]
fn every_operation_reaches_its_handler_once() {
    let host = Host::new();
    let seen = Seen::default();
    let dispatcher = counting_dispatcher(&seen);

    for op in OperationCode::ALL {
        let responses = Responses::default();
        dispatcher
            .dispatch(op.code(), host.params(op, None), responses.callback())
            .unwrap();

        let response = responses.single();
        assert!(response.is_success(), "{} failed: {:?}", op, response);
        assert!(response.decode::<serde_json::Value>().unwrap().is_ok());
    }

    assert_eq!(*seen.handled.lock().unwrap(), OperationCode::ALL.to_vec());
}

#[test]
fn absent_result_is_internal_error_for_every_operation() {
    let host = Host::new();
    let dispatcher = dispatcher_for(|_| Silent);

    for op in OperationCode::ALL {
        let responses = Responses::default();
        dispatcher
            .dispatch(op.code(), host.params(op, None), responses.callback())
            .unwrap();
        assert_eq!(
            responses.single(),
            ServiceResponse::Error {
                code: StatusCode::InternalError
            },
            "{}",
            op
        );
    }
}

#[test]
fn missing_capability_fails_before_any_handler() {
    let host = Host::new();
    let seen = Seen::default();
    let dispatcher = counting_dispatcher(&seen);

    for op in OperationCode::ALL {
        for capability in required_capabilities(op) {
            let responses = Responses::default();
            let err = dispatcher
                .dispatch(op.code(), host.params(op, Some(*capability)), responses.callback())
                .unwrap_err();
            match err {
                DispatchError::MissingCapability {
                    op: failed,
                    capability: missing,
                } => {
                    assert_eq!(failed, op);
                    assert_eq!(missing, *capability);
                }
                other => panic!("{} without {}: unexpected {:?}", op, capability, other),
            }
            assert!(responses.all().is_empty());
        }
    }

    assert!(seen.handled.lock().unwrap().is_empty());
    assert!(seen.tokens.lock().unwrap().is_empty());
}

#[test]
fn unknown_operation_code_is_a_local_failure() {
    let host = Host::new();
    let seen = Seen::default();
    let responses = Responses::default();

    let err = counting_dispatcher(&seen)
        .dispatch(9999, host.params(OperationCode::Execute, None), responses.callback())
        .unwrap_err();

    assert!(matches!(err, DispatchError::UnknownOperation(9999)));
    assert!(seen.handled.lock().unwrap().is_empty());
    assert!(responses.all().is_empty());
}

#[test]
fn empty_application_name_is_rejected() {
    let host = Host::new();
    let seen = Seen::default();
    let params = ServiceParams::new()
        .with_data_access(host.data.clone())
        .with_federated_compute(host.scheduler.clone())
        .with_model_service(host.model.clone())
        .with_encoded_input(&ExecuteInput::default())
        .unwrap();

    let err = counting_dispatcher(&seen)
        .dispatch(
            OperationCode::Execute.code(),
            params,
            Responses::default().callback(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::MissingField {
            field: "app_package_name",
            ..
        }
    ));
    assert!(seen.handled.lock().unwrap().is_empty());
}

struct Panicking;

impl IsolatedWorker for Panicking {
    fn on_execute(
        &self,
        input: ExecuteInput,
        _reply: Reply<ExecuteOutput>,
    ) -> Result<(), IsolatedServiceError> {
        let missing: Option<&str> = input.app_params.as_str();
        let _ = missing.unwrap().len();
        Ok(())
    }
}

#[test]
fn panicking_handler_reports_internal_error_only() {
    let host = Host::new();
    let responses = Responses::default();

    dispatcher_for(|_| Panicking)
        .dispatch(
            OperationCode::Execute.code(),
            host.params(OperationCode::Execute, None),
            responses.callback(),
        )
        .unwrap();

    assert_eq!(
        responses.single(),
        ServiceResponse::Error {
            code: StatusCode::InternalError
        }
    );
}

struct Failing;

impl IsolatedWorker for Failing {
    fn on_render(
        &self,
        _input: RenderInput,
        reply: Reply<RenderOutput>,
    ) -> Result<(), IsolatedServiceError> {
        // Keep the reply alive past the handler's return.
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            reply.send(RenderOutput::default());
        });
        Err(IsolatedServiceError::new(7))
    }
}

#[test]
fn handler_error_wins_over_a_late_reply() {
    let host = Host::new();
    let responses = Responses::default();

    dispatcher_for(|_| Failing)
        .dispatch(
            OperationCode::Render.code(),
            host.params(OperationCode::Render, None),
            responses.callback(),
        )
        .unwrap();
    thread::sleep(Duration::from_millis(100));

    assert_eq!(responses.single().code(), StatusCode::InternalError);
}

struct PanicsLater;

impl IsolatedWorker for PanicsLater {
    fn on_web_trigger(
        &self,
        _input: WebTriggerInput,
        reply: Reply<WebTriggerOutput>,
    ) -> Result<(), IsolatedServiceError> {
        thread::spawn(move || {
            let _reply = reply;
            panic!("worker thread failed");
        });
        Ok(())
    }
}

#[test]
fn reply_lost_on_a_panicking_thread_is_internal_error() {
    let host = Host::new();
    let responses = Responses::default();

    dispatcher_for(|_| PanicsLater)
        .dispatch(
            OperationCode::WebTrigger.code(),
            host.params(OperationCode::WebTrigger, None),
            responses.callback(),
        )
        .unwrap();

    for _ in 0..100 {
        if !responses.all().is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(responses.single().code(), StatusCode::InternalError);
}

#[test]
fn tokens_carry_only_the_capabilities_of_their_operation() {
    let host = Host::new();
    let seen = Seen::default();
    let dispatcher = counting_dispatcher(&seen);

    for op in OperationCode::ALL {
        dispatcher
            .dispatch(op.code(), host.params(op, None), Responses::default().callback())
            .unwrap();
    }

    let tokens = seen.tokens.lock().unwrap();
    for token in tokens.iter() {
        let expect_scheduler = matches!(
            token.operation(),
            OperationCode::Execute | OperationCode::DownloadCompleted
        );
        assert_eq!(
            token.federated_compute_scheduler().is_ok(),
            expect_scheduler,
            "{}",
            token.operation()
        );
        let expect_model = !matches!(
            token.operation(),
            OperationCode::Render | OperationCode::TrainingExample
        );
        assert_eq!(token.has_model_service(), expect_model, "{}", token.operation());
        assert_eq!(token.model_manager().is_ok(), expect_model, "{}", token.operation());

        let expect_user_data = token.operation() != OperationCode::Render;
        assert_eq!(
            token.user_data() == Some(&user_data()),
            expect_user_data,
            "{}",
            token.operation()
        );
    }

    let mut ids: Vec<_> = tokens.iter().map(RequestToken::id).collect();
    ids.sort_by_key(|id| *id.as_uuid());
    ids.dedup();
    assert_eq!(ids.len(), OperationCode::ALL.len());
}

/// Completes execute from its own thread after a delay.
struct Slow;

impl IsolatedWorker for Slow {
    fn on_execute(
        &self,
        input: ExecuteInput,
        reply: Reply<ExecuteOutput>,
    ) -> Result<(), IsolatedServiceError> {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            reply.send(ExecuteOutput {
                output_data: Some(input.app_package_name.into_bytes()),
                ..Default::default()
            });
        });
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn offloaded_completion_reaches_a_oneshot_receiver() {
    let host = Host::new();
    let (tx, rx) = tokio::sync::oneshot::channel::<ServiceResponse>();

    dispatcher_for(|_| Slow)
        .dispatch(
            OperationCode::Execute.code(),
            host.params(OperationCode::Execute, None),
            Box::new(tx),
        )
        .unwrap();

    let response = rx.await.unwrap();
    match &response {
        ServiceResponse::Success { metadata, .. } => {
            assert!(metadata.elapsed >= Duration::from_millis(30));
        }
        other => panic!("expected success, got {:?}", other),
    }
    let output: ExecuteOutput = response.decode().unwrap().unwrap();
    assert_eq!(output.output_data.as_deref(), Some(&b"com.example.app"[..]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatches_answer_their_own_callbacks() {
    let host = Arc::new(Host::new());
    let dispatcher = dispatcher_for(|_| Slow);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let host = host.clone();
            let dispatcher = dispatcher.clone();
            tokio::task::spawn_blocking(move || {
                let (tx, rx) = tokio::sync::oneshot::channel::<ServiceResponse>();
                let params = ServiceParams::new()
                    .with_data_access(host.data.clone())
                    .with_federated_compute(host.scheduler.clone())
                    .with_model_service(host.model.clone())
                    .with_encoded_input(&ExecuteInput {
                        app_package_name: format!("app.{}", i),
                        ..Default::default()
                    })
                    .unwrap();
                dispatcher
                    .dispatch(OperationCode::Execute.code(), params, Box::new(tx))
                    .unwrap();
                (i, rx)
            })
        })
        .collect();

    for task in tasks {
        let (i, rx) = task.await.unwrap();
        let output: ExecuteOutput = rx.await.unwrap().decode().unwrap().unwrap();
        assert_eq!(output.output_data, Some(format!("app.{}", i).into_bytes()));
    }
}
