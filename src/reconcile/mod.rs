//! Pairing client-observed runs with server-recorded runs
//!
//! Runs are joined on sequence number only. The client run list drives the
//! pass, so the report holds one [`RunResult`] per client run whether or not
//! the server recorded it.

use crate::{
    client::GroupSource,
    error::{AppError, Result},
    logging::Logger,
    models::{ReconciliationReport, ReportSummary, ResultIssue, Run, RunGroup, RunResult},
};
use std::sync::Arc;

/// Reconcile a finished client group against the server's view of it
///
/// Fails when the client group has no runs, since no mean can be taken.
pub fn reconcile(client_group: &RunGroup, server_group: &RunGroup) -> Result<ReconciliationReport> {
    let results: Vec<RunResult> = client_group
        .runs()
        .iter()
        .map(|client_run| compare_run(client_run, server_group.run_by_sequence(client_run.sequence)))
        .collect();

    if results.is_empty() {
        return Err(AppError::reconciliation(format!(
            "no results to reconcile for run group {}",
            client_group.id()
        )));
    }

    // Unmatched results contribute zero but still count in the denominator
    let total_ns: u128 = results.iter().map(|r| r.client_duration_ns as u128).sum();
    let average_response_time_ns = (total_ns / results.len() as u128) as u64;
    let summary = summarize(&results);

    Ok(ReconciliationReport {
        client_run_group: client_group.clone(),
        server_run_group: server_group.clone(),
        results,
        average_response_time_ns,
        summary,
    })
}

/// Build the verdict for one client run
pub fn compare_run(client_run: &Run, server_run: Option<&Run>) -> RunResult {
    let mut result = RunResult {
        group_id: client_run.group_id.clone(),
        sequence: client_run.sequence,
        run_id: None,
        client_time: client_run.created_at,
        server_time: None,
        client_duration_ns: 0,
        server_duration_ns: 0,
        upstream_status: None,
        upstream_latency_ns: None,
        issues: Vec::new(),
    };

    if let Some(error) = &client_run.error {
        result.issues.push(ResultIssue::ClientFailure { error: error.clone() });
    }

    let Some(server_run) = server_run else {
        result.issues.push(ResultIssue::ServerRunNotFound);
        return result;
    };

    result.run_id = server_run.id.clone();
    result.server_time = Some(server_run.created_at);
    result.client_duration_ns = client_run.client_duration_ns();
    result.server_duration_ns = server_run.server_duration_ns();
    result.upstream_status = server_run.upstream_status;
    result.upstream_latency_ns = server_run.upstream_latency_ns;

    if client_run.payload != server_run.payload {
        result.issues.push(ResultIssue::DataMismatch);
    }
    if client_run.sequence != server_run.sequence {
        result.issues.push(ResultIssue::SequenceMismatch {
            expected: client_run.sequence,
            actual: server_run.sequence,
        });
    }

    result
}

fn summarize(results: &[RunResult]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: results.len(),
        ..Default::default()
    };
    let mut min_ns = u64::MAX;

    for result in results {
        if result.is_clean() {
            summary.clean += 1;
        } else {
            summary.with_issues += 1;
        }

        if result.is_matched() {
            summary.matched += 1;
            min_ns = min_ns.min(result.client_duration_ns);
            summary.max_client_duration_ns = summary.max_client_duration_ns.max(result.client_duration_ns);
        } else {
            summary.unmatched += 1;
        }
    }

    if summary.matched > 0 {
        summary.min_client_duration_ns = min_ns;
    }
    summary
}

/// Fetches the server view of a group and reconciles against it
pub struct ReconciliationEngine {
    source: Arc<dyn GroupSource>,
    logger: Logger,
}

impl ReconciliationEngine {
    pub fn new(source: Arc<dyn GroupSource>, logger: Logger) -> Self {
        Self { source, logger }
    }

    /// Produce the report for a completed client group
    pub async fn create(&self, client_group: &RunGroup) -> Result<ReconciliationReport> {
        self.logger
            .info("fetching server run group")
            .field("run_group_id", client_group.id())
            .log()
            .await;

        let server_group = self.source.fetch_group(client_group.id()).await?;
        self.logger
            .debug("received server run group")
            .field("run_group_id", server_group.id())
            .field("server_runs", server_group.runs().len())
            .log()
            .await;

        let report = match reconcile(client_group, &server_group) {
            Ok(report) => report,
            Err(e) => {
                self.logger.error("reconciliation failed").error_info(&e).log().await;
                return Err(e);
            }
        };

        for result in report.failing_results() {
            self.logger
                .warn("run has issues")
                .field("run_group_id", &result.group_id)
                .field("sequence", result.sequence)
                .field("issues", result.issue_summary())
                .log()
                .await;
        }

        self.logger
            .info("reconciled")
            .field("run_group_id", client_group.id())
            .field("results", report.results.len())
            .field("clean", report.summary.clean)
            .field("average_response_time_ns", report.average_response_time_ns)
            .log()
            .await;

        Ok(report)
    }
}
