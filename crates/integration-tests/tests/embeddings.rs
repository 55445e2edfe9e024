mod harness;

use harness::mock_backend::MockBackend;
use harness::{GatewayServer, config_from_toml, single_provider_config};
use prism_core::RequestContext;
use prism_llm::types::EmbedInput;
use prism_llm::{EmbeddingRequest, GatewayState};

#[tokio::test]
async fn response_length_matches_input_length() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();

    let request = EmbeddingRequest {
        model: "openai.text-embedding-3-small".to_owned(),
        input: EmbedInput::Multiple(vec!["one".to_owned(), "two".to_owned(), "three".to_owned()]),
        user: None,
    };

    let response = state.embed(request, RequestContext::new()).await.unwrap();

    assert_eq!(response.data.len(), 3);
    for (position, entry) in response.data.iter().enumerate() {
        assert_eq!(entry.index, position);
        assert!(!entry.embedding.is_empty());
    }
    assert_eq!(response.provider, "openai");
    assert_eq!(response.model, "openai.text-embedding-3-small");
    assert_eq!(backend.embedding_calls(), 1);
}

#[tokio::test]
async fn single_string_input_yields_one_vector() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();

    let request = EmbeddingRequest {
        model: "openai.text-embedding-3-small".to_owned(),
        input: EmbedInput::Single("just one".to_owned()),
        user: None,
    };

    let response = state.embed(request, RequestContext::new()).await.unwrap();
    assert_eq!(response.data.len(), 1);
}

#[tokio::test]
async fn embedding_via_mapping_resolves_the_wire_model() {
    let backend = MockBackend::start().await.unwrap();
    let config = config_from_toml(&format!(
        r#"
        [providers.openai]
        type = "openai"
        api_key = "sk-test"
        base_url = "{}"

        [routing.model_mappings.embedder]
        provider = "openai"
        provider_model_id = "text-embedding-3-small"
        "#,
        backend.base_url()
    ));
    let state = GatewayState::from_config(config).unwrap();

    let request = EmbeddingRequest {
        model: "embedder".to_owned(),
        input: EmbedInput::Single("text".to_owned()),
        user: None,
    };

    let response = state.embed(request, RequestContext::new()).await.unwrap();
    assert_eq!(response.model, "openai.text-embedding-3-small");
}

#[tokio::test]
async fn http_embeddings_round_trip() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();
    let server = GatewayServer::start(state).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/embeddings", server.base_url()))
        .json(&serde_json::json!({
            "model": "openai.text-embedding-3-small",
            "input": ["a", "b"]
        }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["object"], "list");
}
