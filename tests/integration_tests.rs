//! Integration tests for the translation server
//!
//! These tests wire the real configuration loader, Vertex AI client and
//! router together, with wiremock standing in for Google's OAuth and
//! Vertex AI endpoints.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serial_test::serial;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_string_contains, header as header_matcher, method, path},
    Mock, MockServer, ResponseTemplate,
};

use gemini_translator::{
    config::{Config, CREDENTIALS_ENV},
    prompt::build_prompt,
    server::create_router,
    state::{AppState, ModelState},
    vertex::VertexClient,
};
use std::sync::Arc;

const FIXTURE: &str = include_str!("fixtures/service_account.json");
const GENERATE_PATH: &str = "/v1/projects/test-project/locations/asia-northeast1/publishers/google/models/gemini-2.5-flash:generateContent";

// ==================== Test Helpers ====================

/// Write a service account file whose token_uri points at the mock server
fn write_credentials(temp_dir: &TempDir, mock_uri: &str) -> std::path::PathBuf {
    let mut document: serde_json::Value = serde_json::from_str(FIXTURE).expect("fixture");
    document["token_uri"] = serde_json::Value::String(format!("{}/token", mock_uri));

    let credentials_path = temp_dir.path().join("credentials.json");
    std::fs::write(&credentials_path, document.to_string()).expect("Failed to write credentials");
    credentials_path
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.integration",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

fn gemini_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [
            {
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }
        ]
    })
}

/// Build the full router against the mock server
fn build_app(temp_dir: &TempDir, mock_uri: &str) -> Router {
    let config = Config {
        credentials_path: write_credentials(temp_dir, mock_uri),
        project_id: "test-project".to_string(),
        region: "asia-northeast1".to_string(),
        api_endpoint: mock_uri.to_string(),
    };
    let client = VertexClient::init(&config).expect("Should initialize");
    create_router(
        AppState::new(ModelState::Ready(Arc::new(client))),
        temp_dir.path(),
    )
}

async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/translate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");

    let response = app.oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

// ==================== End-to-End Translation Tests ====================

#[tokio::test]
async fn test_translate_end_to_end() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header_matcher("Authorization", "Bearer ya29.integration"))
        .and(body_string_contains("Ich habe Hunger"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_response("\n- I am hungry.\n- お腹が空いています。\n\n")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_app(&temp_dir, &mock_server.uri());
    let (status, json) = post_json(app, r#"{"text": "Ich habe Hunger"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({ "translated_text": "- I am hungry.\n- お腹が空いています。" })
    );
}

#[tokio::test]
async fn test_translate_sends_full_prompt() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    mount_token(&mock_server).await;

    let text = "c'est \"génial\"";
    let expected = serde_json::json!({
        "contents": [{ "role": "user", "parts": [{ "text": build_prompt(text) }] }]
    });

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(wiremock::matchers::body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_app(&temp_dir, &mock_server.uri());
    let body = serde_json::json!({ "text": text }).to_string();
    let (status, _) = post_json(app, &body).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_translate_upstream_failure_is_generic() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("Permission denied on project test-project"),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(&temp_dir, &mock_server.uri());
    let (status, json) = post_json(app, r#"{"text": "hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, serde_json::json!({ "error": "Failed to translate text." }));
}

#[tokio::test]
async fn test_translate_token_failure_is_generic() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized_client"))
        .mount(&mock_server)
        .await;

    let app = build_app(&temp_dir, &mock_server.uri());
    let (status, json) = post_json(app, r#"{"text": "hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to translate text.");
}

#[tokio::test]
async fn test_invalid_request_never_reaches_upstream() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = build_app(&temp_dir, &mock_server.uri());
    let (status, json) = post_json(app, r#"{"message": "hello"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid request. \"text\" is required.");
}

// ==================== Startup Tests ====================

#[tokio::test]
#[serial]
async fn test_startup_without_credentials_still_serves() {
    std::env::remove_var(CREDENTIALS_ENV);

    let model = ModelState::initialize();
    assert!(!model.is_ready());

    let app = create_router(AppState::new(model), "static");

    let page = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("infallible");
    assert_eq!(page.status(), StatusCode::OK);

    let (status, json) = post_json(app, r#"{"text": "hello"}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "Translation service is not configured.");
}

#[tokio::test]
#[serial]
async fn test_startup_from_environment() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response("  Hello\n")))
        .mount(&mock_server)
        .await;

    let credentials_path = write_credentials(&temp_dir, &mock_server.uri());
    std::env::set_var(CREDENTIALS_ENV, &credentials_path);
    std::env::set_var("VERTEX_API_ENDPOINT", mock_server.uri());

    let model = ModelState::initialize();

    std::env::remove_var(CREDENTIALS_ENV);
    std::env::remove_var("VERTEX_API_ENDPOINT");

    assert!(model.is_ready());
    let app = create_router(AppState::new(model), temp_dir.path());
    let (status, json) = post_json(app, r#"{"text": "Bonjour"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "translated_text": "Hello" }));
}
