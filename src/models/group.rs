//! Run group data model

use crate::models::run::Run;
use crate::types::{duration_from_ns, AppError, Result, SequenceNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of `POST /test-groups/create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub description: String,

    /// Number of runs N the client will dispatch
    pub run_count: u32,

    /// Worker pool size C, 0 means 1
    #[serde(default)]
    pub concurrency: u32,

    /// Client pause between successive dispatches
    #[serde(default)]
    pub client_delay_ns: u64,

    /// Server pause before answering each run
    #[serde(default)]
    pub server_delay_ns: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_ns: Option<u64>,
}

impl GroupSpec {
    pub fn new(run_count: u32) -> Self {
        Self {
            run_count,
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_upstream(mut self, endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        self.upstream_endpoint = Some(endpoint.into());
        self.upstream_timeout_ns = timeout.map(crate::types::duration_to_ns);
        self
    }

    /// Reject specs the server cannot honour
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.upstream_endpoint {
            let parsed = url::Url::parse(endpoint)
                .map_err(|e| AppError::validation(format!("Invalid upstream endpoint '{}': {}", endpoint, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::validation(format!(
                    "Upstream endpoint must use http or https: {}",
                    endpoint
                )));
            }
        }
        if self.upstream_timeout_ns == Some(0) {
            return Err(AppError::validation("Upstream timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// One configured batch of N runs plus the runs recorded for it
///
/// The identifier and run count are fixed at creation, and `runs` only grows,
/// so those three fields are private and reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunGroup {
    id: String,
    run_count: u32,

    #[serde(default)]
    pub description: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub concurrency: u32,

    #[serde(default)]
    pub client_delay_ns: u64,

    #[serde(default)]
    pub server_delay_ns: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_ns: Option<u64>,

    #[serde(default)]
    runs: Vec<Run>,

    /// Client-side payload for every dispatched run, never sent as part of the group
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl RunGroup {
    /// Create a group with a fresh server-assigned identifier
    pub fn create(spec: GroupSpec) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), spec)
    }

    /// Create a group with a known identifier
    pub fn with_id(id: impl Into<String>, spec: GroupSpec) -> Self {
        Self {
            id: id.into(),
            run_count: spec.run_count,
            description: spec.description,
            created_at: Utc::now(),
            concurrency: spec.concurrency,
            client_delay_ns: spec.client_delay_ns,
            server_delay_ns: spec.server_delay_ns,
            remote_addr: None,
            upstream_endpoint: spec.upstream_endpoint,
            upstream_timeout_ns: spec.upstream_timeout_ns,
            runs: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn run_count(&self) -> u32 {
        self.run_count
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Append a recorded run
    pub fn push_run(&mut self, run: Run) {
        self.runs.push(run);
    }

    /// Worker pool size with the unset value mapped to 1
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1) as usize
    }

    pub fn client_delay(&self) -> Duration {
        duration_from_ns(self.client_delay_ns)
    }

    pub fn server_delay(&self) -> Duration {
        duration_from_ns(self.server_delay_ns)
    }

    /// Upstream deadline, falling back to the default when unset
    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout_ns
            .map(duration_from_ns)
            .unwrap_or(crate::defaults::DEFAULT_UPSTREAM_TIMEOUT)
    }

    /// Linear scan for the first run with the given sequence number
    pub fn run_by_sequence(&self, sequence: SequenceNumber) -> Option<&Run> {
        self.runs.iter().find(|run| run.sequence == sequence)
    }

    /// Copy of this group without its runs, as the client starts from
    pub fn without_runs(&self) -> Self {
        Self {
            runs: Vec::new(),
            ..self.clone()
        }
    }
}
