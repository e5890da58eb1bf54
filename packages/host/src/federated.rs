//! A federated compute scheduler that only keeps track of jobs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use isolate_core::{
    Completion, FederatedComputeService, Logger, StatusCode, TrainingOptions, TransportError,
};

#[derive(Debug, Default)]
struct Jobs {
    active: BTreeMap<String, TrainingOptions>,
    cancelled: Vec<String>,
    failure: Option<i32>,
}

/// Accepts schedule and cancel requests and records them.
///
/// Scheduling a population again replaces its options. Requests complete
/// inline.
#[derive(Debug)]
pub struct RecordingScheduler {
    jobs: Mutex<Jobs>,
    logger: Logger,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Jobs::default()),
            logger: Logger::new("host_scheduler"),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Answer every following request with `code`.
    pub fn fail_with(&self, code: StatusCode) {
        self.jobs().failure = Some(code.code());
    }

    /// Options of the job training `population`, if scheduled.
    pub fn scheduled(&self, population: &str) -> Option<TrainingOptions> {
        self.jobs().active.get(population).cloned()
    }

    pub fn active_populations(&self) -> Vec<String> {
        self.jobs().active.keys().cloned().collect()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.jobs().cancelled.clone()
    }

    fn jobs(&self) -> MutexGuard<'_, Jobs> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RecordingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FederatedComputeService for RecordingScheduler {
    fn schedule(
        &self,
        options: TrainingOptions,
        completion: Completion<()>,
    ) -> Result<(), TransportError> {
        let mut jobs = self.jobs();
        if let Some(code) = jobs.failure {
            drop(jobs);
            completion.on_error(code);
            return Ok(());
        }
        self.logger.info(format_args!(
            "scheduled '{}' every {:?}",
            options.population_name, options.training_interval.minimum_interval
        ));
        jobs.active.insert(options.population_name.clone(), options);
        drop(jobs);
        completion.on_success(());
        Ok(())
    }

    fn cancel(
        &self,
        population_name: &str,
        completion: Completion<()>,
    ) -> Result<(), TransportError> {
        let mut jobs = self.jobs();
        if let Some(code) = jobs.failure {
            drop(jobs);
            completion.on_error(code);
            return Ok(());
        }
        jobs.active.remove(population_name);
        jobs.cancelled.push(population_name.to_string());
        drop(jobs);
        self.logger
            .info(format_args!("cancelled '{}'", population_name));
        completion.on_success(());
        Ok(())
    }
}
