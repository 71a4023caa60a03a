//! Recording server
//!
//! Holds run groups in memory, records every run posted to it and serves the
//! recorded groups back for reconciliation.

pub mod handlers;
pub mod registry;
pub mod upstream;

pub use registry::{GroupRegistry, SharedGroup};
pub use upstream::{UpstreamClient, UpstreamOutcome};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    logging::Logger,
    models::ServerConfig,
};

/// Shared application state
pub struct ServerState {
    pub registry: GroupRegistry,
    pub upstream: UpstreamClient,
    pub logger: Logger,
}

impl ServerState {
    pub fn new(logger: Logger) -> Result<Self> {
        Ok(Self {
            registry: GroupRegistry::new(),
            upstream: UpstreamClient::new()?,
            logger,
        })
    }
}

/// Build the router for all endpoints
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/test-groups", get(handlers::list_groups))
        .route("/test-groups/create", post(handlers::create_group))
        .route("/test-groups/{group_id}", get(handlers::get_group))
        .route("/test-groups/{group_id}/{sequence}", post(handlers::record_run))
        .with_state(state)
}

/// Bind the configured address and serve until `cancel` fires
pub async fn serve(config: &ServerConfig, logger: Logger, cancel: CancellationToken) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, logger, cancel).await
}

/// Serve on an already bound listener until `cancel` fires
pub async fn serve_listener(listener: TcpListener, logger: Logger, cancel: CancellationToken) -> Result<()> {
    let state = Arc::new(ServerState::new(logger.clone())?);
    let app = build_router(state);

    logger
        .info("server listening")
        .field("addr", listener.local_addr()?.to_string())
        .log()
        .await;

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    logger.info("server stopped").log().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupSpec, RunError, RunGroup};
    use reqwest::StatusCode;
    use std::time::Duration;
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    async fn start() -> (String, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        tokio::spawn(serve_listener(listener, Logger::new("TEST"), cancel.clone()));
        (format!("http://{}", addr), cancel)
    }

    async fn create(base: &str, spec: &GroupSpec) -> RunGroup {
        reqwest::Client::new()
            .post(format!("{}/test-groups/create", base))
            .json(spec)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn fetch(base: &str, id: &str) -> reqwest::Response {
        reqwest::get(format!("{}/test-groups/{}", base, id)).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_record_and_fetch() {
        let (base, cancel) = start().await;
        let group = create(&base, &GroupSpec::new(2)).await;
        let client = reqwest::Client::new();

        for seq in [2, 1] {
            let response = client
                .post(format!("{}/test-groups/{}/{}", base, group.id(), seq))
                .body("payload")
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let fetched: RunGroup = fetch(&base, group.id()).await.json().await.unwrap();
        let sequences: Vec<u32> = fetched.runs().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 1]);
        for run in fetched.runs() {
            assert_eq!(run.payload, b"payload");
            assert!(run.id.is_some());
            assert!(run.server_end >= run.server_start);
        }

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_unknown_group_is_404() {
        let (base, cancel) = start().await;

        assert_eq!(fetch(&base, "missing").await.status(), StatusCode::NOT_FOUND);
        let response = reqwest::Client::new()
            .post(format!("{}/test-groups/missing/1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_bad_sequence_is_400_without_side_effects() {
        let (base, cancel) = start().await;
        let group = create(&base, &GroupSpec::new(1)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/test-groups/{}/abc", base, group.id()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Checked before the group lookup
        let response = client
            .post(format!("{}/test-groups/missing/-1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let fetched: RunGroup = fetch(&base, group.id()).await.json().await.unwrap();
        assert!(fetched.runs().is_empty());

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_malformed_create_is_400() {
        let (base, cancel) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/test-groups/create", base))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("{}/test-groups/create", base))
            .json(&GroupSpec::new(1).with_upstream("ftp://example.com", None))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let (base, cancel) = start().await;
        let first = create(&base, &GroupSpec::new(1)).await;
        let second = create(&base, &GroupSpec::new(2)).await;

        let groups: Vec<RunGroup> = reqwest::get(format!("{}/test-groups", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let ids: Vec<&str> = groups.iter().map(RunGroup::id).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_upstream_passthrough_is_recorded() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_millis(20)))
            .expect(2)
            .mount(&upstream)
            .await;

        let (base, cancel) = start().await;
        let group = create(&base, &GroupSpec::new(2).with_upstream(upstream.uri(), None)).await;
        let client = reqwest::Client::new();
        for seq in 1..=2 {
            client
                .post(format!("{}/test-groups/{}/{}", base, group.id(), seq))
                .send()
                .await
                .unwrap();
        }

        let fetched: RunGroup = fetch(&base, group.id()).await.json().await.unwrap();
        assert_eq!(fetched.runs().len(), 2);
        for run in fetched.runs() {
            assert_eq!(run.upstream_status, Some(202));
            assert!(run.upstream_latency_ns.unwrap() >= 20_000_000);
            assert!(run.error.is_none());
        }

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_failed_upstream_records_zero_status() {
        let (base, cancel) = start().await;
        let spec = GroupSpec::new(1).with_upstream("http://127.0.0.1:9", Some(Duration::from_secs(2)));
        let group = create(&base, &spec).await;

        let response = reqwest::Client::new()
            .post(format!("{}/test-groups/{}/1", base, group.id()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fetched: RunGroup = fetch(&base, group.id()).await.json().await.unwrap();
        let run = &fetched.runs()[0];
        assert_eq!(run.upstream_status, Some(0));
        assert!(matches!(run.error, Some(RunError::Upstream(_))));

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_server_delay_holds_response() {
        let (base, cancel) = start().await;
        let mut spec = GroupSpec::new(1);
        spec.server_delay_ns = 100_000_000;
        let group = create(&base, &spec).await;

        let started = std::time::Instant::now();
        reqwest::Client::new()
            .post(format!("{}/test-groups/{}/1", base, group.id()))
            .send()
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));

        // Recorded before the delay, so the server duration excludes it
        let fetched: RunGroup = fetch(&base, group.id()).await.json().await.unwrap();
        assert!(fetched.runs()[0].server_duration_ns() < 100_000_000);

        cancel.cancel();
    }
}
