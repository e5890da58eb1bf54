use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use isolate_core::{
    keys, AdapterConfig, Bundle, Completion, DataAccessOp, DataAccessService, Logger,
    SyncAdapter, TransportError,
};
use tokio::runtime::Handle;

/// Echoes `value` back as `result` from a tokio task, after a delay that
/// varies per call so completions finish out of issue order.
struct EchoOnRuntime {
    runtime: Handle,
    calls: AtomicUsize,
}

impl DataAccessService for EchoOnRuntime {
    fn on_request(
        &self,
        _op: DataAccessOp,
        params: Bundle,
        completion: Completion<Bundle>,
    ) -> Result<(), TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis((n * 7) % 13)).await;
            let mut result = Bundle::new();
            if let Some(value) = params.get_bytes(keys::VALUE) {
                result.put_bytes(keys::RESULT, value.clone());
            }
            completion.on_success(result);
        });
        Ok(())
    }
}

fn echo_adapter() -> SyncAdapter {
    let service = Arc::new(EchoOnRuntime {
        runtime: Handle::current(),
        calls: AtomicUsize::new(0),
    });
    SyncAdapter::new(service, AdapterConfig::default(), Logger::disabled())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payloads_round_trip_exactly() {
    let adapter = echo_adapter();

    let payloads: Vec<Vec<u8>> = vec![
        vec![],
        vec![0],
        vec![1, 2, 3],
        (0..=255).collect(),
        vec![0xff; 4096],
    ];

    let results = tokio::task::spawn_blocking(move || {
        payloads
            .iter()
            .map(|payload| {
                let mut params = Bundle::new();
                params.put_bytes(keys::VALUE, payload.clone());
                let result = adapter.call(DataAccessOp::LocalLookup, params).unwrap();
                (payload.clone(), result.get_bytes(keys::RESULT).cloned())
            })
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    for (sent, received) in results {
        assert_eq!(received.as_deref(), Some(sent.as_slice()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_calls_receive_only_their_own_outcome() {
    let adapter = echo_adapter();

    let tasks: Vec<_> = (0u32..32)
        .map(|i| {
            let adapter = adapter.clone();
            tokio::task::spawn_blocking(move || {
                let mut params = Bundle::new();
                params.put_bytes(keys::VALUE, i.to_be_bytes().to_vec());
                let result = adapter.call(DataAccessOp::RemoteLookup, params).unwrap();
                (i, result.get_bytes(keys::RESULT).cloned())
            })
        })
        .collect();

    for task in tasks {
        let (i, received) = task.await.unwrap();
        assert_eq!(received.as_deref(), Some(&i.to_be_bytes()[..]));
    }
}
