//! Draining completed runs into the group

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::{Run, RunGroup},
};
use tokio::sync::mpsc;

/// Receive exactly `group.run_count()` runs and append them in arrival order
///
/// Fails instead of waiting forever if every producer went away early.
pub async fn collect_results(
    group: &mut RunGroup,
    results: &mut mpsc::Receiver<Run>,
    logger: &Logger,
) -> Result<usize> {
    let expected = group.run_count() as usize;

    for received in 0..expected {
        match results.recv().await {
            Some(run) => {
                logger.debug("received").run(&run).log().await;
                group.push_run(run);
            }
            None => {
                return Err(AppError::execution(format!(
                    "result channel closed after {} of {} runs",
                    received, expected
                )));
            }
        }
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupSpec;

    #[tokio::test]
    async fn test_collects_exactly_n() {
        let mut group = RunGroup::with_id("g1", GroupSpec::new(3));
        let (tx, mut rx) = mpsc::channel(4);
        for seq in [3, 1, 2, 4] {
            tx.send(Run::descriptor("g1", seq, vec![])).await.unwrap();
        }

        let collected = collect_results(&mut group, &mut rx, &Logger::new("TEST")).await.unwrap();
        assert_eq!(collected, 3);
        let order: Vec<u32> = group.runs().iter().map(|r| r.sequence).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_early_close_is_an_error() {
        let mut group = RunGroup::with_id("g1", GroupSpec::new(3));
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Run::descriptor("g1", 1, vec![])).await.unwrap();
        drop(tx);

        let err = collect_results(&mut group, &mut rx, &Logger::new("TEST")).await.unwrap_err();
        assert!(matches!(err, AppError::Execution(_)));
        assert_eq!(group.runs().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_runs_returns_immediately() {
        let mut group = RunGroup::with_id("g1", GroupSpec::new(0));
        let (_tx, mut rx) = mpsc::channel::<Run>(1);
        let collected = collect_results(&mut group, &mut rx, &Logger::new("TEST")).await.unwrap();
        assert_eq!(collected, 0);
    }
}
