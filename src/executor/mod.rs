//! Group execution engine
//!
//! This module contains the client-side execution components:
//! - Dispatcher that generates sequence-numbered run descriptors and paces them
//! - Fixed pool of C workers draining a shared queue through a [`RemoteCaller`]
//! - Collector that waits for exactly N completed runs

pub mod collector;
pub mod dispatcher;

pub use collector::collect_results;
pub use dispatcher::{build_descriptor, dispatch, Dispatch};

use crate::{
    client::RemoteCaller,
    error::{AppError, Result},
    logging::Logger,
    models::RunGroup,
    types::RunStatus,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Summary of one group execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Wall-clock time from dispatch to the last collected run
    pub total_duration: Duration,
    /// Number of runs collected
    pub total_runs: u32,
    pub successful_runs: u32,
    pub failed_runs: u32,
    pub timeout_runs: u32,
    pub cancelled_runs: u32,
}

impl ExecutionSummary {
    /// Tally the collected runs of a group
    pub fn from_group(group: &RunGroup, total_duration: Duration) -> Self {
        let mut summary = Self {
            total_duration,
            ..Default::default()
        };

        for run in group.runs() {
            summary.total_runs += 1;
            match run.status() {
                RunStatus::Success => summary.successful_runs += 1,
                RunStatus::Timeout => summary.timeout_runs += 1,
                RunStatus::Cancelled => summary.cancelled_runs += 1,
                RunStatus::Failed | RunStatus::Pending => summary.failed_runs += 1,
            }
        }

        summary
    }

    /// Percentage of runs that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.successful_runs as f64 / self.total_runs as f64 * 100.0
        }
    }
}

/// Runs a whole group through the dispatcher, worker pool and collector
pub struct GroupExecutor {
    caller: Arc<dyn RemoteCaller>,
    logger: Logger,
    cancel: CancellationToken,
}

impl GroupExecutor {
    pub fn new(caller: Arc<dyn RemoteCaller>, logger: Logger, cancel: CancellationToken) -> Self {
        Self {
            caller,
            logger,
            cancel,
        }
    }

    /// Execute every run of `group` and append the completed runs to it
    ///
    /// On return the group holds exactly `run_count` runs in completion order.
    pub async fn execute(&self, group: &mut RunGroup) -> Result<ExecutionSummary> {
        let started = Instant::now();
        let correlation_id = self.logger.start_operation("execute_group").await;

        self.logger
            .info("dispatching runs")
            .correlation_id(&correlation_id)
            .field("run_group_id", group.id())
            .field("run_count", group.run_count())
            .field("concurrency", group.effective_concurrency())
            .field("client_delay_ns", group.client_delay_ns)
            .log()
            .await;

        let mut handles = dispatch(group, self.caller.clone(), &self.logger, &self.cancel);
        let collected = collect_results(group, &mut handles.results, &self.logger.named("COLLECTOR")).await;

        // Workers exit once the feeder closes the queue and it drains
        let feeder = handles.feeder.await;
        let workers = futures::future::join_all(handles.workers).await;

        let joined = join_tasks(feeder, workers).map_err(AppError::from);
        let outcome = match (collected, joined) {
            (Ok(_), joined) => joined,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(task_error)) => {
                // A panicked worker is why the result channel closed early
                self.logger
                    .error("task failed before reporting its run")
                    .correlation_id(&correlation_id)
                    .error_info(&task_error)
                    .log()
                    .await;
                Err(e)
            }
        };

        self.logger
            .end_operation(&correlation_id, "execute_group", outcome.is_ok())
            .await;
        outcome?;

        let summary = ExecutionSummary::from_group(group, started.elapsed());
        self.logger
            .info("collected runs")
            .correlation_id(&correlation_id)
            .field("run_group_id", group.id())
            .field("successful", summary.successful_runs)
            .field("failed", summary.failed_runs)
            .field("timeouts", summary.timeout_runs)
            .field("cancelled", summary.cancelled_runs)
            .log()
            .await;

        Ok(summary)
    }
}

fn join_tasks(
    feeder: std::result::Result<usize, JoinError>,
    workers: Vec<std::result::Result<usize, JoinError>>,
) -> anyhow::Result<()> {
    feeder.context("dispatcher task failed")?;
    for (worker_id, worker) in workers.into_iter().enumerate() {
        worker.with_context(|| format!("worker {} failed", worker_id))?;
    }
    Ok(())
}
