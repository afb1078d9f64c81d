#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Ollama client tests against a mocked HTTP server.
// Run with: cargo test --test integration_ollama

use faq_search::SearchError;
use faq_search::config::Config;
use faq_search::embeddings::{EmbeddingProvider, OllamaClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_MODEL: &str = "nomic-embed-text:latest";

fn client_for(server: &MockServer) -> OllamaClient {
    let addr = server.address();

    let mut config = Config::default();
    config.ollama.host = addr.ip().to_string();
    config.ollama.port = addr.port();
    config.ollama.model = TEST_MODEL.to_string();

    OllamaClient::new(&config)
        .expect("should create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(1)
}

#[tokio::test]
async fn health_check_succeeds_when_model_listed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": TEST_MODEL, "size": 274_302_450_u64, "digest": "abc"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task should join");

    assert!(result.is_ok(), "health check should pass: {:?}", result);
}

#[tokio::test]
async fn missing_model_is_model_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "some-other-model"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.validate_model())
        .await
        .expect("task should join");

    assert!(matches!(result, Err(SearchError::ModelUnavailable(_))));
}

#[tokio::test]
async fn embed_returns_unit_length_vector() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [3.0, 4.0, 0.0]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let embedding = tokio::task::spawn_blocking(move || client.embed("how do i enroll"))
        .await
        .expect("task should join")
        .expect("embed should succeed");

    assert_eq!(embedding.len(), 3);
    assert!((embedding[0] - 0.6).abs() < 1e-6);
    assert!((embedding[1] - 0.8).abs() < 1e-6);

    let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn empty_embedding_is_model_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.embed("anything"))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(SearchError::ModelUnavailable(_))));
}

#[tokio::test]
async fn server_error_surfaces_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.embed("anything"))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(SearchError::ModelUnavailable(_))));
}

#[tokio::test]
async fn unreachable_server_is_model_unavailable() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    drop(server);

    let result = tokio::task::spawn_blocking(move || client.ping())
        .await
        .expect("task should join");

    assert!(matches!(result, Err(SearchError::ModelUnavailable(_))));
}
