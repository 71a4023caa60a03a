//! Run descriptor generation and the fixed worker pool
//!
//! The dispatcher creates N descriptors, feeds them in sequence order into a
//! queue sized to N, and starts C workers that drain the queue through a
//! [`RemoteCaller`]. Every descriptor that enters the queue produces exactly
//! one completed run on the result channel.

use crate::{
    client::RemoteCaller,
    logging::Logger,
    models::{Run, RunError, RunGroup},
    types::SequenceNumber,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Handles to a running dispatch
pub struct Dispatch {
    /// Completed runs, in completion order
    pub results: mpsc::Receiver<Run>,
    /// Feeder task
    pub feeder: JoinHandle<usize>,
    /// One handle per worker
    pub workers: Vec<JoinHandle<usize>>,
}

/// Descriptor for one sequence number of the group
///
/// An empty group payload gives every run its own UUID so that data-mismatch
/// checks still mean something.
pub fn build_descriptor(group: &RunGroup, sequence: SequenceNumber) -> Run {
    let payload = if group.payload.is_empty() {
        uuid::Uuid::new_v4().to_string().into_bytes()
    } else {
        group.payload.clone()
    };
    Run::descriptor(group.id(), sequence, payload)
}

/// Start C workers and the feeder for `group`
pub fn dispatch(
    group: &RunGroup,
    caller: Arc<dyn RemoteCaller>,
    logger: &Logger,
    cancel: &CancellationToken,
) -> Dispatch {
    let run_count = group.run_count() as usize;
    let concurrency = group.effective_concurrency();
    // Sized to N so neither the feeder nor the workers block on a full channel
    let capacity = run_count.max(1);

    let (work_tx, work_rx) = mpsc::channel::<Run>(capacity);
    let (result_tx, result_rx) = mpsc::channel::<Run>(capacity);
    let work_rx = Arc::new(Mutex::new(work_rx));

    let workers = (0..concurrency)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                work_rx.clone(),
                result_tx.clone(),
                caller.clone(),
                logger.named("WORKER"),
                cancel.clone(),
            ))
        })
        .collect();
    drop(result_tx);

    let descriptors: Vec<Run> = (1..=group.run_count())
        .map(|sequence| build_descriptor(group, sequence))
        .collect();

    let feeder = tokio::spawn(feed(
        descriptors,
        work_tx,
        group.client_delay(),
        logger.named("DISPATCHER"),
        cancel.clone(),
    ));

    Dispatch {
        results: result_rx,
        feeder,
        workers,
    }
}

/// Push descriptors into the work queue with fixed pacing, then close it
async fn feed(
    descriptors: Vec<Run>,
    work_tx: mpsc::Sender<Run>,
    delay: Duration,
    logger: Logger,
    cancel: CancellationToken,
) -> usize {
    let total = descriptors.len();
    let mut fed = 0;

    for run in descriptors {
        logger.debug("start").run(&run).log().await;
        if work_tx.send(run).await.is_err() {
            logger.error("work queue closed before all runs were dispatched")
                .field("dispatched", fed)
                .field("run_count", total)
                .log()
                .await;
            break;
        }
        fed += 1;

        // Once cancelled, the remaining descriptors are queued without pacing
        // and the workers turn each into a cancelled result.
        if fed < total && !delay.is_zero() && !cancel.is_cancelled() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fed
}

/// Take descriptors until the queue is closed and drained
async fn run_worker(
    worker_id: usize,
    work_rx: Arc<Mutex<mpsc::Receiver<Run>>>,
    result_tx: mpsc::Sender<Run>,
    caller: Arc<dyn RemoteCaller>,
    logger: Logger,
    cancel: CancellationToken,
) -> usize {
    let mut completed = 0;

    loop {
        let next = { work_rx.lock().await.recv().await };
        let Some(run) = next else { break };

        let run = if cancel.is_cancelled() {
            cancelled(run)
        } else {
            caller.execute_run(run, &cancel).await
        };

        match &run.error {
            Some(_) => logger.warn("run failed").field("worker", worker_id).run(&run).log().await,
            None => logger.debug("run completed").field("worker", worker_id).run(&run).log().await,
        }

        if result_tx.send(run).await.is_err() {
            break;
        }
        completed += 1;
    }

    completed
}

fn cancelled(mut run: Run) -> Run {
    let now = Utc::now();
    run.client_start = Some(now);
    run.client_end = Some(now);
    run.error = Some(RunError::Cancelled);
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupSpec;

    #[test]
    fn test_descriptor_uses_group_payload() {
        let mut group = RunGroup::with_id("g1", GroupSpec::new(2));
        group.payload = b"x".to_vec();

        let run = build_descriptor(&group, 2);
        assert_eq!(run.group_id, "g1");
        assert_eq!(run.sequence, 2);
        assert_eq!(run.payload, b"x");
    }

    #[test]
    fn test_empty_payload_gets_unique_uuid() {
        let group = RunGroup::with_id("g1", GroupSpec::new(2));

        let a = build_descriptor(&group, 1);
        let b = build_descriptor(&group, 2);
        assert_eq!(a.payload.len(), 36);
        assert_ne!(a.payload, b.payload);
    }

    #[test]
    fn test_cancelled_marks_run() {
        let run = cancelled(Run::descriptor("g1", 1, vec![]));
        assert_eq!(run.error, Some(RunError::Cancelled));
        assert_eq!(run.client_duration_ns(), 0);
    }
}
