//! HTTP-level tests for the LLM client against a mock server

use std::time::Duration;
use task_intake::{LlmClient, PipelineError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_openai_format_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "{\"decision\": \"create_new\"}"}}]
        })))
        .mount(&server)
        .await;

    let client = LlmClient::new(
        "test-key".into(),
        format!("{}/v1/chat/completions", server.uri()),
        "test-model".into(),
        Duration::from_secs(5),
    );

    let response = client.complete("system prompt", "user content").await.unwrap();
    assert!(response.contains("create_new"));
}

#[tokio::test]
async fn test_api_error_surfaces_as_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = LlmClient::new(
        "test-key".into(),
        server.uri(),
        "test-model".into(),
        Duration::from_secs(5),
    );

    let err = client.complete("system", "user").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn test_empty_choices_is_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(
        "test-key".into(),
        server.uri(),
        "test-model".into(),
        Duration::from_secs(5),
    );

    let err = client.complete("system", "user").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
}

/// A hung provider call times out instead of hanging the pipeline.
#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(serde_json::json!({
                    "choices": [{"message": {"content": "late"}}]
                })),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(
        "test-key".into(),
        server.uri(),
        "test-model".into(),
        Duration::from_millis(200),
    );

    let err = client.complete("system", "user").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
}
