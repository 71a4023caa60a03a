//! HTTP client for the recording server: run requests and group queries

#[cfg(test)]
mod integration_tests;

use crate::{
    error::{AppError, Result},
    models::{GroupSpec, Run, RunError, RunGroup},
    types::duration_to_ns,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Executes one run against the server
///
/// Implementations never fail: every outcome, including cancellation, is
/// recorded on the returned run so the collector always receives one result
/// per descriptor.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    async fn execute_run(&self, run: Run, cancel: &CancellationToken) -> Run;
}

/// Source of the server's view of a group
#[async_trait]
pub trait GroupSource: Send + Sync {
    async fn fetch_group(&self, group_id: &str) -> Result<RunGroup>;
}

/// reqwest-backed client for one remote server
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base: Url,
    request_timeout: Duration,
}

impl RemoteClient {
    /// Create a new client for the given base address
    pub fn new(remote: &str, request_timeout: Duration) -> Result<Self> {
        let base = Url::parse(remote)?;
        if base.cannot_be_a_base() {
            return Err(AppError::config(format!("Remote address cannot be a base URL: {}", remote)));
        }

        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Build `{base}/test-groups/{segments...}`, escaping each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::config(format!("Remote address cannot be a base URL: {}", self.base)))?;
            path.pop_if_empty().push("test-groups");
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// URL a run is posted to
    pub fn run_url(&self, run: &Run) -> Result<Url> {
        self.endpoint(&[&run.group_id, &run.sequence.to_string()])
    }

    /// Create a group on the server
    pub async fn create_group(&self, spec: &GroupSpec) -> Result<RunGroup> {
        let url = self.endpoint(&["create"])?;
        let response = self
            .client
            .post(url)
            .json(spec)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = Self::check_status(response, "create group").await?;
        Ok(response.json::<RunGroup>().await?)
    }

    /// List all groups known to the server
    pub async fn list_groups(&self) -> Result<Vec<RunGroup>> {
        let url = self.endpoint(&[])?;
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = Self::check_status(response, "list groups").await?;
        Ok(response.json::<Vec<RunGroup>>().await?)
    }

    /// Map non-success responses to errors, 404 to `NotFound`
    async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = if body.trim().is_empty() {
            format!("{} failed with status {}", action, status.as_u16())
        } else {
            format!("{} failed with status {}: {}", action, status.as_u16(), body.trim())
        };

        if status == StatusCode::NOT_FOUND {
            Err(AppError::not_found(detail))
        } else {
            Err(AppError::http_request(detail))
        }
    }
}

#[async_trait]
impl RemoteCaller for RemoteClient {
    async fn execute_run(&self, mut run: Run, cancel: &CancellationToken) -> Run {
        let url = match self.run_url(&run) {
            Ok(url) => url,
            Err(e) => {
                let now = Utc::now();
                run.client_start = Some(now);
                run.client_end = Some(now);
                run.error = Some(RunError::Transport(e.to_string()));
                return run;
            }
        };

        let request = self.client.post(url).body(run.payload.clone()).send();

        run.client_start = Some(Utc::now());
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(RunError::Cancelled),
            result = timeout(self.request_timeout, request) => match result {
                Err(_) => Err(RunError::Timeout(duration_to_ns(self.request_timeout) / 1_000_000)),
                Ok(Err(e)) => Err(RunError::Transport(e.to_string())),
                Ok(Ok(response)) if response.status() == StatusCode::OK => Ok(()),
                Ok(Ok(response)) => Err(RunError::BadStatus(response.status().as_u16())),
            },
        };
        run.client_end = Some(Utc::now());

        if let Err(error) = outcome {
            run.error = Some(error);
        }
        run
    }
}

#[async_trait]
impl GroupSource for RemoteClient {
    async fn fetch_group(&self, group_id: &str) -> Result<RunGroup> {
        let url = self.endpoint(&[group_id])?;
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = Self::check_status(response, "fetch group").await?;
        Ok(response.json::<RunGroup>().await?)
    }
}
