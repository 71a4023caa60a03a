//! Remote client integration tests against mock servers

use super::*;
use crate::models::{GroupSpec, RunGroup};
use crate::types::RunStatus;
use wiremock::{
    matchers::{body_bytes, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn client_for(server: &MockServer, timeout: Duration) -> RemoteClient {
    RemoteClient::new(&server.uri(), timeout).unwrap()
}

#[tokio::test]
async fn test_successful_run_records_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-groups/g1/1"))
        .and(body_bytes(b"hello".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let run = client
        .execute_run(Run::descriptor("g1", 1, b"hello".to_vec()), &CancellationToken::new())
        .await;

    assert!(run.error.is_none(), "unexpected error: {:?}", run.error);
    assert_eq!(run.status(), RunStatus::Success);
    let (start, end) = (run.client_start.unwrap(), run.client_end.unwrap());
    assert!(end >= start);
}

#[tokio::test]
async fn test_non_200_is_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-groups/g1/2"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let run = client
        .execute_run(Run::descriptor("g1", 2, vec![]), &CancellationToken::new())
        .await;

    assert_eq!(run.error, Some(RunError::BadStatus(201)));
    assert!(run.client_end.is_some());
}

#[tokio::test]
async fn test_unknown_group_is_bad_status_404() {
    let server = MockServer::start().await;
    let client = client_for(&server, Duration::from_secs(5)).await;

    let run = client
        .execute_run(Run::descriptor("missing", 1, vec![]), &CancellationToken::new())
        .await;

    assert_eq!(run.error, Some(RunError::BadStatus(404)));
}

#[tokio::test]
async fn test_transport_failure_still_measures_duration() {
    // Nothing listens on port 9 on loopback
    let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
    let run = client
        .execute_run(Run::descriptor("g1", 1, vec![]), &CancellationToken::new())
        .await;

    assert!(matches!(run.error, Some(RunError::Transport(_))));
    assert!(run.client_start.is_some());
    assert!(run.client_end.is_some());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-groups/g1/1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_millis(100)).await;
    let run = client
        .execute_run(Run::descriptor("g1", 1, vec![]), &CancellationToken::new())
        .await;

    assert_eq!(run.error, Some(RunError::Timeout(100)));
    assert_eq!(run.status(), RunStatus::Timeout);
}

#[tokio::test]
async fn test_cancelled_token_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(30)).await;
    let token = CancellationToken::new();
    token.cancel();

    let run = client.execute_run(Run::descriptor("g1", 1, vec![]), &token).await;
    assert_eq!(run.error, Some(RunError::Cancelled));
    assert!(run.client_end.is_some());
}

#[tokio::test]
async fn test_fetch_group() {
    let server = MockServer::start().await;
    let mut group = RunGroup::with_id("g1", GroupSpec::new(2));
    group.push_run(Run::received("g1", 1, b"x".to_vec()));

    Mock::given(method("GET"))
        .and(path("/test-groups/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&group))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let fetched = client.fetch_group("g1").await.unwrap();

    assert_eq!(fetched.id(), "g1");
    assert_eq!(fetched.run_count(), 2);
    assert_eq!(fetched.runs().len(), 1);
    assert_eq!(fetched.runs()[0].payload, b"x");
}

#[tokio::test]
async fn test_fetch_unknown_group_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-groups/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let err = client.fetch_group("nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_fetch_group_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-groups/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let err = client.fetch_group("g1").await.unwrap_err();
    assert!(matches!(err, AppError::Parse(_)));
}

#[tokio::test]
async fn test_create_and_list_groups() {
    let server = MockServer::start().await;
    let created = RunGroup::with_id("new-group", GroupSpec::new(3).with_concurrency(2));

    Mock::given(method("POST"))
        .and(path("/test-groups/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&created))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![&created]))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let group = client
        .create_group(&GroupSpec::new(3).with_concurrency(2))
        .await
        .unwrap();
    assert_eq!(group.id(), "new-group");
    assert_eq!(group.concurrency, 2);

    let groups = client.list_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
}
