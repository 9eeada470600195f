//! Concurrent execution of sweep runs.

use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::engine::run_simulation;
use crate::error::{Result, SimError};
use crate::merge_policy::MergePolicy;
use crate::settings::Settings;
use crate::sweep::config::SweepConfig;
use crate::sweep::outcome::{RunOutcome, SweepReport};

/// Run a sweep with a freshly built thread pool.
pub fn run_sweep(settings: &Settings, config: &SweepConfig) -> Result<SweepReport> {
    SweepRunner::new(config.clone())?.run(settings)
}

/// Executes independent simulation runs on a dedicated thread pool.
pub struct SweepRunner {
    config: SweepConfig,
    thread_pool: ThreadPool,
}

impl SweepRunner {
    /// Create a new sweep runner.
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let thread_pool_size = config.thread_pool_size.unwrap_or_else(num_cpus::get);

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(thread_pool_size)
            .thread_name(|i| format!("sweep-{i}"))
            .build()
            .map_err(|e| SimError::thread_pool(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            config,
            thread_pool,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run every (buffer, policy) pair. A failing run is recorded and does
    /// not stop the others.
    pub fn run(&self, settings: &Settings) -> Result<SweepReport> {
        let jobs: Vec<(u64, MergePolicy)> = self
            .config
            .buffer_sizes()
            .into_iter()
            .flat_map(|buffer| self.config.policies.iter().map(move |&p| (buffer, p)))
            .collect();

        log::info!(
            "sweeping {} runs on {} threads",
            jobs.len(),
            self.thread_pool.current_num_threads()
        );

        let started_at = Utc::now();
        // Collecting an indexed parallel iterator keeps job order.
        let outcomes: Vec<RunOutcome> = self.thread_pool.install(|| {
            jobs.par_iter()
                .map(|&(buffer, policy)| Self::execute_single_run(settings, buffer, policy))
                .collect()
        });
        let finished_at = Utc::now();

        Ok(SweepReport {
            started_at,
            finished_at,
            outcomes,
        })
    }

    fn execute_single_run(settings: &Settings, buffer: u64, policy: MergePolicy) -> RunOutcome {
        let start = Instant::now();
        let settings = settings.clone().with_buffer(buffer);

        match run_simulation(&settings, policy) {
            Ok(report) => {
                RunOutcome::success(policy.name().to_string(), buffer, report, start.elapsed())
            }
            Err(e) => {
                log::warn!("{policy} with buffer {buffer} failed: {e}");
                RunOutcome::failure(policy.name().to_string(), buffer, e, start.elapsed())
            }
        }
    }
}
