//! Scheduling of federated compute jobs.

use std::time::{Duration, Instant};

use isolate_core::{
    await_completion, ApiName, CallError, DataAccessHandle, FederatedComputeHandle, Logger,
    Result, StatusCode, TrainingOptions,
};

use crate::types::{FederatedComputeInput, SchedulerParams};

/// Schedules and cancels federated training jobs for the worker.
///
/// Calls block for at most the configured timeout. Each call's latency and
/// outcome is reported to the host through the data access handle.
#[derive(Clone)]
pub struct FederatedComputeScheduler {
    service: FederatedComputeHandle,
    stats: DataAccessHandle,
    timeout: Duration,
    logger: Logger,
}

impl FederatedComputeScheduler {
    pub fn new(
        service: FederatedComputeHandle,
        stats: DataAccessHandle,
        timeout: Duration,
        logger: Logger,
    ) -> Self {
        Self {
            service,
            stats,
            timeout,
            logger,
        }
    }

    /// Schedule training of `input.population_name`.
    pub fn schedule(&self, params: &SchedulerParams, input: &FederatedComputeInput) -> Result<()> {
        check_population(&input.population_name)?;
        let options = TrainingOptions {
            population_name: input.population_name.clone(),
            training_interval: params.training_interval.clone(),
        };
        let service = &self.service;
        self.timed(ApiName::FederatedComputeSchedule, || {
            await_completion("federated_compute_schedule", Some(self.timeout), |completion| {
                service.schedule(options, completion)
            })
        })
    }

    /// Cancel any job training `input.population_name`.
    pub fn cancel(&self, input: &FederatedComputeInput) -> Result<()> {
        check_population(&input.population_name)?;
        let service = &self.service;
        let population = input.population_name.as_str();
        self.timed(ApiName::FederatedComputeCancel, || {
            await_completion("federated_compute_cancel", Some(self.timeout), |completion| {
                service.cancel(population, completion)
            })
        })
    }

    fn timed(&self, api: ApiName, call: impl FnOnce() -> Result<()>) -> Result<()> {
        let started = Instant::now();
        let result = call();
        let status = match &result {
            Ok(()) => StatusCode::Success.code(),
            Err(e) => {
                self.logger.error(format_args!("{} failed: {}", api, e));
                e.remote_code()
                    .unwrap_or_else(|| StatusCode::InternalError.code())
            }
        };
        self.stats.log_api_call_stats(api, started.elapsed(), status);
        result
    }
}

impl std::fmt::Debug for FederatedComputeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedComputeScheduler")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn check_population(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CallError::InvalidArgument(
            "population name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isolate_core::{
        Bundle, Completion, DataAccessOp, DataAccessService, FederatedComputeService,
        SchedulingMode, TrainingInterval, TransportError,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Stats {
        calls: Mutex<Vec<(ApiName, i32)>>,
    }

    impl DataAccessService for Stats {
        fn on_request(
            &self,
            _op: DataAccessOp,
            _params: Bundle,
            completion: Completion<Bundle>,
        ) -> std::result::Result<(), TransportError> {
            completion.on_error(204);
            Ok(())
        }

        fn log_api_call_stats(&self, api: ApiName, _latency: Duration, status: i32) {
            self.calls.lock().unwrap().push((api, status));
        }
    }

    /// Accepts schedules, rejects cancels, never answers "stuck".
    #[derive(Default)]
    struct Jobs {
        scheduled: Mutex<Vec<TrainingOptions>>,
        held: Mutex<Vec<Completion<()>>>,
    }

    impl FederatedComputeService for Jobs {
        fn schedule(
            &self,
            options: TrainingOptions,
            completion: Completion<()>,
        ) -> std::result::Result<(), TransportError> {
            if options.population_name == "stuck" {
                self.held.lock().unwrap().push(completion);
            } else {
                self.scheduled.lock().unwrap().push(options);
                completion.on_success(());
            }
            Ok(())
        }

        fn cancel(
            &self,
            _population_name: &str,
            completion: Completion<()>,
        ) -> std::result::Result<(), TransportError> {
            completion.on_error(StatusCode::ServiceFailed.code());
            Ok(())
        }
    }

    fn params() -> SchedulerParams {
        SchedulerParams {
            training_interval: TrainingInterval {
                mode: SchedulingMode::Recurrent,
                minimum_interval: Duration::from_secs(60),
            },
        }
    }

    fn input(name: &str) -> FederatedComputeInput {
        FederatedComputeInput {
            population_name: name.to_string(),
        }
    }

    fn scheduler(jobs: &Arc<Jobs>, stats: &Arc<Stats>, timeout: Duration) -> FederatedComputeScheduler {
        FederatedComputeScheduler::new(jobs.clone(), stats.clone(), timeout, Logger::disabled())
    }

    #[test]
    fn schedule_forwards_options_and_reports_success() {
        let jobs = Arc::new(Jobs::default());
        let stats = Arc::new(Stats::default());
        scheduler(&jobs, &stats, Duration::from_secs(5))
            .schedule(&params(), &input("pop"))
            .unwrap();

        let scheduled = jobs.scheduled.lock().unwrap();
        assert_eq!(scheduled[0].population_name, "pop");
        assert_eq!(scheduled[0].training_interval, params().training_interval);
        assert_eq!(
            *stats.calls.lock().unwrap(),
            vec![(ApiName::FederatedComputeSchedule, 0)]
        );
    }

    #[test]
    fn cancel_failure_reports_remote_code() {
        let jobs = Arc::new(Jobs::default());
        let stats = Arc::new(Stats::default());
        let err = scheduler(&jobs, &stats, Duration::from_secs(5))
            .cancel(&input("pop"))
            .unwrap_err();

        assert_eq!(err.remote_code(), Some(103));
        assert_eq!(
            *stats.calls.lock().unwrap(),
            vec![(ApiName::FederatedComputeCancel, 103)]
        );
    }

    #[test]
    fn unanswered_schedule_times_out() {
        let jobs = Arc::new(Jobs::default());
        let stats = Arc::new(Stats::default());
        let err = scheduler(&jobs, &stats, Duration::from_millis(20))
            .schedule(&params(), &input("stuck"))
            .unwrap_err();

        assert!(matches!(err, CallError::TimedOut { .. }));
        assert_eq!(
            *stats.calls.lock().unwrap(),
            vec![(ApiName::FederatedComputeSchedule, 100)]
        );
    }

    #[test]
    fn empty_population_is_rejected() {
        let jobs = Arc::new(Jobs::default());
        let stats = Arc::new(Stats::default());
        let err = scheduler(&jobs, &stats, Duration::from_secs(5))
            .schedule(&params(), &input(""))
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidArgument(_)));
        assert!(stats.calls.lock().unwrap().is_empty());
    }
}
