//! HTTP handlers for the recording server

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{GroupSpec, Run, RunGroup},
    server::ServerState,
    types::SequenceNumber,
};

/// `AppError` rendered as a plain-text error response
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// `POST /test-groups/create`
pub async fn create_group(State(state): State<Arc<ServerState>>, body: Bytes) -> ApiResult<Json<RunGroup>> {
    let spec: GroupSpec = serde_json::from_slice(&body).map_err(AppError::from)?;
    spec.validate()?;

    let group = RunGroup::create(spec);
    let created = group.clone();
    if state.registry.insert(group).await.is_none() {
        return Err(AppError::internal(format!("run group id collision: {}", created.id())).into());
    }

    state
        .logger
        .info("created run group")
        .field("run_group_id", created.id())
        .field("run_count", created.run_count())
        .field("concurrency", created.concurrency)
        .field("upstream_endpoint", &created.upstream_endpoint)
        .log()
        .await;

    Ok(Json(created))
}

/// `GET /test-groups`
pub async fn list_groups(State(state): State<Arc<ServerState>>) -> Json<Vec<RunGroup>> {
    Json(state.registry.list().await)
}

/// `GET /test-groups/{group_id}`
pub async fn get_group(
    State(state): State<Arc<ServerState>>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<RunGroup>> {
    let group = state
        .registry
        .get(&group_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("run group {}", group_id)))?;

    let snapshot = group.lock().await.clone();
    Ok(Json(snapshot))
}

/// `POST /test-groups/{group_id}/{sequence}`
///
/// Records the run and answers 200 after the group's server delay.
pub async fn record_run(
    State(state): State<Arc<ServerState>>,
    Path((group_id, sequence)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let sequence: SequenceNumber = sequence
        .parse()
        .map_err(|e| AppError::parse(format!("invalid sequence number '{}': {}", sequence, e)))?;

    let group = match state.registry.get(&group_id).await {
        Some(group) => group,
        None => {
            state
                .logger
                .warn("run for unknown group")
                .field("run_group_id", &group_id)
                .field("sequence", sequence)
                .log()
                .await;
            return Err(AppError::not_found(format!("run group {}", group_id)).into());
        }
    };

    let (upstream, upstream_timeout, server_delay) = {
        let group = group.lock().await;
        (group.upstream_endpoint.clone(), group.upstream_timeout(), group.server_delay())
    };

    let mut run = Run::received(&group_id, sequence, body.to_vec());
    if let Some(endpoint) = upstream {
        let outcome = state.upstream.call(&endpoint, upstream_timeout).await;
        outcome.apply_to(&mut run);
    }
    run.server_end = Some(Utc::now());

    state.logger.debug("recorded run").run(&run).log().await;
    group.lock().await.push_run(run);

    if !server_delay.is_zero() {
        tokio::time::sleep(server_delay).await;
    }

    Ok(StatusCode::OK)
}
