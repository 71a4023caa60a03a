//! Reconciliation results and the report written by the client

use crate::models::{group::RunGroup, run::RunError};
use crate::types::SequenceNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One reason a reconciled run is not clean
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultIssue {
    /// The client-side call itself failed
    ClientFailure { error: RunError },
    /// No server run carries this sequence number
    ServerRunNotFound,
    /// Server recorded different payload bytes
    DataMismatch,
    /// Paired server run reports a different sequence number
    SequenceMismatch {
        expected: SequenceNumber,
        actual: SequenceNumber,
    },
}

impl fmt::Display for ResultIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientFailure { error } => write!(f, "{}", error),
            Self::ServerRunNotFound => write!(f, "server run not found"),
            Self::DataMismatch => write!(f, "data mismatch"),
            Self::SequenceMismatch { expected, actual } => {
                write!(f, "run count mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

/// Verdict for one client run paired with its server counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub group_id: String,
    pub sequence: SequenceNumber,

    /// Identifier the server assigned, absent when unmatched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    pub client_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<DateTime<Utc>>,

    pub client_duration_ns: u64,
    pub server_duration_ns: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_latency_ns: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ResultIssue>,
}

impl RunResult {
    /// True when no check failed
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn is_matched(&self) -> bool {
        !self.issues.contains(&ResultIssue::ServerRunNotFound)
    }

    pub fn has_issue(&self, issue: &ResultIssue) -> bool {
        self.issues.contains(issue)
    }

    /// Issues rendered as a single line for console output
    pub fn issue_summary(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Counts and latency bounds over a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub clean: usize,
    pub with_issues: usize,
    pub min_client_duration_ns: u64,
    pub max_client_duration_ns: u64,
}

impl ReportSummary {
    /// Fraction of results without issues, 0.0 for an empty pass
    pub fn clean_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.clean as f64 / self.total as f64
        }
    }
}

/// Everything a reconciliation pass produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub client_run_group: RunGroup,
    pub server_run_group: RunGroup,
    pub results: Vec<RunResult>,

    /// Sum of client durations divided by the number of results
    pub average_response_time_ns: u64,

    pub summary: ReportSummary,
}

impl ReconciliationReport {
    pub fn failing_results(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| !r.is_clean())
    }
}
