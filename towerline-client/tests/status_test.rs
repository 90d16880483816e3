//! Tests for completion and outcome checks.
//!
//! Tests cover:
//! - The finished timestamp deciding completion
//! - Artifact exports merging on completion
//! - The failed flag and malformed status responses

use serde_json::json;
use towerline_client::{RunningJob, ServerProfile, TowerClient, TowerError};
use towerline_core::TemplateKind;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> TowerClient {
    TowerClient::with_http_client(ServerProfile::new(server.uri()), reqwest::Client::new())
}

async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/ping/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "3.4.1" })))
        .mount(server)
        .await;
}

async fn mount_job_detail(server: &MockServer, detail: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/jobs/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_a_null_finished_timestamp_means_still_running() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(&server, json!({ "id": 5, "finished": null })).await;

    let mut job = RunningJob::new(5, TemplateKind::Job);
    assert!(!client(&server).is_completed(&mut job).await.unwrap());
}

#[tokio::test]
async fn test_the_string_null_also_means_still_running() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(&server, json!({ "id": 5, "finished": "null" })).await;

    let mut job = RunningJob::new(5, TemplateKind::Job);
    assert!(!client(&server).is_completed(&mut job).await.unwrap());
}

#[tokio::test]
async fn test_a_set_finished_timestamp_means_completed() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(
        &server,
        json!({ "id": 5, "finished": "2019-10-03T14:21:58.123456Z" }),
    )
    .await;

    let mut job = RunningJob::new(5, TemplateKind::Job);
    assert!(client(&server).is_completed(&mut job).await.unwrap());
}

#[tokio::test]
async fn test_completion_merges_artifact_exports() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(
        &server,
        json!({
            "id": 5,
            "finished": "2019-10-03T14:21:58.123456Z",
            "artifacts": {
                "JENKINS_EXPORT": [
                    { "VERSION": "1.4.2" },
                    { "REGION": "eu-west-1" }
                ]
            }
        }),
    )
    .await;

    let mut job = RunningJob::new(5, TemplateKind::Job);
    assert!(client(&server).is_completed(&mut job).await.unwrap());
    assert_eq!(job.exports().get("VERSION"), Some("1.4.2"));
    assert_eq!(job.exports().get("REGION"), Some("eu-west-1"));
}

#[tokio::test]
async fn test_a_missing_finished_field_is_an_error() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(&server, json!({ "id": 5, "status": "running" })).await;

    let mut job = RunningJob::new(5, TemplateKind::Job);
    let error = client(&server).is_completed(&mut job).await.unwrap_err();
    assert!(matches!(error, TowerError::ParseError(_)), "got {error}");
}

#[tokio::test]
async fn test_is_failed_reads_the_failed_flag() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(
        &server,
        json!({ "id": 5, "finished": "2019-10-03T14:21:58Z", "failed": false }),
    )
    .await;

    let job = RunningJob::new(5, TemplateKind::Job);
    assert!(!client(&server).is_failed(&job).await.unwrap());
}

#[tokio::test]
async fn test_is_failed_on_a_failed_run() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(
        &server,
        json!({ "id": 5, "finished": "2019-10-03T14:21:58Z", "failed": true }),
    )
    .await;

    let job = RunningJob::new(5, TemplateKind::Job);
    assert!(client(&server).is_failed(&job).await.unwrap());
}

#[tokio::test]
async fn test_a_non_boolean_failed_flag_is_an_error() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_job_detail(&server, json!({ "id": 5, "failed": "kind of" })).await;

    let job = RunningJob::new(5, TemplateKind::Job);
    let error = client(&server).is_failed(&job).await.unwrap_err();
    assert!(matches!(error, TowerError::ParseError(_)), "got {error}");
}

#[tokio::test]
async fn test_workflow_status_uses_the_workflow_collection() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/workflow_jobs/900/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 900,
            "finished": "2019-10-03T14:21:58Z",
            "failed": false
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut job = RunningJob::new(900, TemplateKind::Workflow);
    assert!(client.is_completed(&mut job).await.unwrap());
    assert!(!client.is_failed(&job).await.unwrap());
}
