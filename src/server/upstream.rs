//! Outbound passthrough call made while recording a run

use crate::{
    error::{AppError, Result},
    models::{Run, RunError},
    types::duration_to_ns,
};
use reqwest::Client;
use std::time::{Duration, Instant};

/// Status and timing of one upstream GET
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamOutcome {
    /// Response status, 0 when no response arrived
    pub status: u16,
    pub latency_ns: u64,
    pub error: Option<String>,
}

impl UpstreamOutcome {
    /// Copy the outcome onto a server run record
    pub fn apply_to(&self, run: &mut Run) {
        run.upstream_status = Some(self.status);
        run.upstream_latency_ns = Some(self.latency_ns);
        if let Some(error) = &self.error {
            run.error = Some(RunError::Upstream(error.clone()));
        }
    }
}

/// Shared client for upstream calls
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create upstream client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET `endpoint` bounded by `timeout`
    ///
    /// Any status counts as a response; only transport failures and the
    /// deadline produce an error.
    pub async fn call(&self, endpoint: &str, timeout: Duration) -> UpstreamOutcome {
        let started = Instant::now();
        let response = tokio::time::timeout(timeout, self.client.get(endpoint).send()).await;
        let latency_ns = duration_to_ns(started.elapsed());

        match response {
            Ok(Ok(response)) => UpstreamOutcome {
                status: response.status().as_u16(),
                latency_ns,
                error: None,
            },
            Ok(Err(e)) => UpstreamOutcome {
                status: 0,
                latency_ns,
                error: Some(e.to_string()),
            },
            Err(_) => UpstreamOutcome {
                status: 0,
                latency_ns,
                error: Some(format!("timed out after {}ms", timeout.as_millis())),
            },
        }
    }
}
