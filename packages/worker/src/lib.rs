//! Isolate Worker: the sandboxed side of the isolate protocol.
//!
//! A host hands each request to a [`Dispatcher`] together with a result
//! callback. The dispatcher validates the request, mints a
//! [`RequestToken`] holding the request's capabilities, and calls the
//! matching [`IsolatedWorker`] handler. The handler answers through a
//! [`Reply`]; the host callback fires exactly once per dispatched request.
//!
//! Worker code reaches host data through blocking facades obtained from
//! the token:
//!
//! - [`RemoteData`] and [`LocalData`]: key/value tables
//! - [`LogReader`]: request and event logs
//! - [`EventUrlProvider`]: event tracking URLs
//! - [`FederatedComputeScheduler`]: federated training jobs
//! - [`ModelManager`]: model inference
//!
//! Facade calls block until the host answers. Make them from a thread of
//! the worker's own, never from the dispatching thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use isolate_worker::{Dispatcher, IsolatedWorker, Reply, ServiceParams, WorkerConfig};
//!
//! struct Greeter(RequestToken);
//!
//! impl IsolatedWorker for Greeter {
//!     fn on_execute(&self, input: ExecuteInput, reply: Reply<ExecuteOutput>) -> Result<(), IsolatedServiceError> {
//!         let remote = self.0.remote_data();
//!         std::thread::spawn(move || {
//!             let greeting = remote.get("greeting").ok().flatten();
//!             reply.send(ExecuteOutput { output_data: greeting, ..Default::default() });
//!         });
//!         Ok(())
//!     }
//! }
//!
//! let service = |token: &RequestToken| -> Box<dyn IsolatedWorker> { Box::new(Greeter(token.clone())) };
//! let dispatcher = Dispatcher::new(Arc::new(service), WorkerConfig::default(), Logger::new("worker"));
//! dispatcher.dispatch(OperationCode::Execute.code(), params, Box::new(tx))?;
//! ```

mod config;
mod dispatcher;
mod error;
mod event_url;
mod log_reader;
mod model;
mod response;
mod scheduler;
mod stores;
mod token;
pub mod types;
mod worker;

pub use config::WorkerConfig;
pub use dispatcher::{Dispatcher, ServiceParams};
pub use error::{DispatchError, IsolatedServiceError, Result};
pub use event_url::EventUrlProvider;
pub use log_reader::LogReader;
pub use model::ModelManager;
pub use response::{CalleeMetadata, IsolatedServiceCallback, Reply, ServiceResponse};
pub use scheduler::FederatedComputeScheduler;
pub use stores::{KeyValueStore, LocalData, MutableKeyValueStore, RemoteData};
pub use token::{RequestId, RequestToken};
pub use types::*;
pub use worker::{IsolatedService, IsolatedWorker};
