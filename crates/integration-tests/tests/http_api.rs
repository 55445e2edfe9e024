mod harness;

use harness::mock_backend::MockBackend;
use harness::{GatewayServer, single_provider_config};
use prism_llm::GatewayState;

async fn started_server() -> (MockBackend, GatewayServer) {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();
    let server = GatewayServer::start(state).await.unwrap();
    (backend, server)
}

#[tokio::test]
async fn unroutable_model_returns_problem_json() {
    let (_backend, server) = started_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/completions", server.base_url()))
        .json(&serde_json::json!({
            "model": "no-such-model",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert_eq!(body["code"], "routing");
    assert!(body["correlationId"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn validation_failure_is_a_400_with_detail() {
    let (_backend, server) = started_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/completions", server.base_url()))
        .json(&serde_json::json!({
            "model": "gpt-4",
            "messages": []
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "validation");
    assert!(body["detail"].as_str().unwrap().contains("messages"));
}

#[tokio::test]
async fn correlation_id_is_echoed_when_supplied() {
    let (_backend, server) = started_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/completions", server.base_url()))
        .header("x-correlation-id", "corr-42")
        .json(&serde_json::json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-correlation-id").unwrap(), "corr-42");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn correlation_id_is_generated_when_absent() {
    let (_backend, server) = started_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/completions", server.base_url()))
        .json(&serde_json::json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .send()
        .await
        .unwrap();

    let header = response.headers().get("x-correlation-id").unwrap().to_str().unwrap();
    assert!(!header.is_empty());
}

#[tokio::test]
async fn models_endpoint_lists_the_registry() {
    let (_backend, server) = started_server().await;

    let response = reqwest::Client::new()
        .get(format!("{}/models", server.base_url()))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert!(data.iter().any(|m| m["id"] == "openai.gpt-4"));
}
