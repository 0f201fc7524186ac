//! Client tests against a mock vending service.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lz_vending_client::{
    AccountRequest, ClientError, ClientOptions, DeployAccountRequest, ProvisioningClient,
};

const API_KEY: &str = "test-service-key";

async fn client_for(server: &MockServer) -> ProvisioningClient {
    ProvisioningClient::with_options(
        server.uri(),
        API_KEY,
        ClientOptions::with_service_name("step-functions"),
    )
    .unwrap()
}

fn deploy_request() -> DeployAccountRequest {
    serde_json::from_value(json!({
        "account_name": "team-a",
        "account_email": "team-a@x.test",
        "output": { "account_id": "111111111111", "ou_name": "Root" }
    }))
    .unwrap()
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message } })
}

// ============================================================================
// Success paths
// ============================================================================

#[tokio::test]
async fn create_account_sends_credentials_and_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/create-account"))
        .and(header("x-api-key", API_KEY))
        .and(header("x-service-name", "step-functions"))
        .and(body_json(json!({
            "account_name": "team-a",
            "account_email": "team-a@x.test",
            "ou_name": "Sandbox"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account_id": "111111111111",
            "ou_name": "Sandbox",
            "organization_unit_id": "ou-sbx1-aaaa"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = client_for(&server)
        .await
        .create_account(&AccountRequest::new("team-a", "team-a@x.test").with_ou("Sandbox"))
        .await
        .unwrap();

    assert_eq!(state.account_id.as_str(), "111111111111");
    assert_eq!(state.ou_name, "Sandbox");
    assert!(!state.is_under_root());
}

#[tokio::test]
async fn deploy_account_threads_prior_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/deploy-account"))
        .and(body_json(json!({
            "account_name": "team-a",
            "account_email": "team-a@x.test",
            "output": { "account_id": "111111111111", "ou_name": "Root" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "account_name": "team-a",
            "account_email": "team-a@x.test",
            "account_id": "111111111111",
            "ou_name": "Root",
            "stack_id": "arn:aws:cloudformation:us-east-1:111111111111:stack/lz-baseline/1"
        })))
        .mount(&server)
        .await;

    let request: DeployAccountRequest = serde_json::from_value(json!({
        "account_name": "team-a",
        "account_email": "team-a@x.test",
        "output": { "account_id": "111111111111", "ou_name": "Root" }
    }))
    .unwrap();

    let output = client_for(&server)
        .await
        .deploy_account(&request)
        .await
        .unwrap();

    assert_eq!(output.status, "Success");
    assert_eq!(output.ou_name, "Root");
}

#[tokio::test]
async fn health_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "service": "lz-vending",
            "version": "0.1.0"
        })))
        .mount(&server)
        .await;

    let health = client_for(&server).await.health().await.unwrap();
    assert_eq!(health.status, "ok");
}

// ============================================================================
// Error mapping
// ============================================================================

#[tokio::test]
async fn fatal_step_failure_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/create-account"))
        .respond_with(ResponseTemplate::new(422).set_body_json(error_body(
            "provisioning_failed",
            "account creation car-0123456789 failed: EMAIL_ALREADY_EXISTS",
        )))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .create_account(&AccountRequest::new("team-a", "team-a@x.test"))
        .await
        .unwrap_err();

    match &err {
        ClientError::Fatal { message } => assert!(message.contains("EMAIL_ALREADY_EXISTS")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn registration_conflict_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/create-account"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(error_body("conflict", "team-a is taken")),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .create_account(&AccountRequest::new("team-a", "team-a@x.test"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Conflict { .. }));
}

#[tokio::test]
async fn unresolved_creation_carries_identifiers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/create-account"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {
                "code": "creation_unresolved",
                "message": "account creation for team-a is unresolved",
                "details": { "request_id": "car-0123456789", "account_id": null }
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .create_account(&AccountRequest::new("team-a", "team-a@x.test"))
        .await
        .unwrap_err();

    match &err {
        ClientError::CreationUnresolved {
            request_id,
            account_id,
            ..
        } => {
            assert_eq!(request_id.as_deref(), Some("car-0123456789"));
            assert_eq!(*account_id, None);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn create_account_server_faults_are_never_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/create-account"))
        .respond_with(ResponseTemplate::new(504).set_body_json(json!({
            "error": {
                "code": "retries_exhausted",
                "message": "still IN_PROGRESS",
                "details": { "operation": "create_account", "attempts": 360 }
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .create_account(&AccountRequest::new("team-a", "team-a@x.test"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::CreationUnresolved { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_service_leaves_create_account_retryable() {
    let client = ProvisioningClient::new("http://127.0.0.1:1", API_KEY).unwrap();

    let err = client
        .create_account(&AccountRequest::new("team-a", "team-a@x.test"))
        .await
        .unwrap_err();

    assert!(err.is_unsent());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn exhausted_deployment_carries_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/deploy-account"))
        .respond_with(ResponseTemplate::new(504).set_body_json(json!({
            "error": {
                "code": "retries_exhausted",
                "message": "AccessDenied",
                "details": { "operation": "assume_role", "attempts": 90 }
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .deploy_account(&deploy_request())
        .await
        .unwrap_err();

    match &err {
        ClientError::RetriesExhausted {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "assume_role");
            assert_eq!(*attempts, 90);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unparseable_error_body_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/steps/deploy-account"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .deploy_account(&deploy_request())
        .await
        .unwrap_err();

    match err {
        ClientError::Api { code, status, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(status, 502);
        }
        other => panic!("unexpected error: {other}"),
    }
}
