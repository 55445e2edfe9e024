mod harness;

use harness::config_from_toml;
use harness::mock_backend::MockBackend;
use prism_core::RequestContext;
use prism_llm::types::{Message, Role};
use prism_llm::{CompletionRequest, GatewayError, GatewayState};

fn two_provider_config(primary_url: &str, backup_url: &str, error_codes: &str) -> prism_config::GatewayConfig {
    config_from_toml(&format!(
        r#"
        [providers.primary]
        type = "openai"
        api_key = "sk-primary"
        base_url = "{primary_url}"

        [providers.backup]
        type = "openai"
        api_key = "sk-backup"
        base_url = "{backup_url}"

        [routing.model_mappings."gpt-4"]
        provider = "primary"
        provider_model_id = "gpt-4"

        [fallback]
        enabled = true

        [[fallback.rules]]
        model = "primary.gpt-4"
        fallbacks = ["backup.gpt-4"]
        error_codes = {error_codes}
        "#
    ))
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4".to_owned(),
        messages: vec![Message::text(Role::User, "hello")],
        max_tokens: None,
        temperature: None,
        top_p: None,
        stop: None,
        stream: false,
        tools: None,
        tool_choice: None,
        user: None,
    }
}

#[tokio::test]
async fn rate_limited_primary_fails_over_with_one_retry() {
    let primary = MockBackend::builder().failing(1, 429).start().await.unwrap();
    let backup = MockBackend::builder().content("backup answer").start().await.unwrap();

    let config = two_provider_config(&primary.base_url(), &backup.base_url(), r#"["rate_limit_exceeded"]"#);
    let state = GatewayState::from_config(config).unwrap();

    let response = state.complete(request(), RequestContext::new()).await.unwrap();

    assert_eq!(response.provider, "backup");
    assert_eq!(response.first_text(), "backup answer");
    assert_eq!(primary.completion_calls(), 1);
    assert_eq!(backup.completion_calls(), 1);
}

#[tokio::test]
async fn non_matching_error_code_skips_the_chain() {
    // Primary fails with 500 but the rule only covers rate limiting
    let primary = MockBackend::builder().failing(1, 500).start().await.unwrap();
    let backup = MockBackend::start().await.unwrap();

    let config = two_provider_config(&primary.base_url(), &backup.base_url(), r#"["rate_limit_exceeded"]"#);
    let state = GatewayState::from_config(config).unwrap();

    let err = state.complete(request(), RequestContext::new()).await.unwrap_err();

    assert!(matches!(err, GatewayError::ProviderUnavailable { .. }));
    assert_eq!(backup.completion_calls(), 0);
}

#[tokio::test]
async fn exhausted_chain_surfaces_fallback_exhausted() {
    let primary = MockBackend::builder().failing(10, 429).start().await.unwrap();
    let backup = MockBackend::builder().failing(10, 429).start().await.unwrap();

    let config = two_provider_config(&primary.base_url(), &backup.base_url(), "[]");
    let state = GatewayState::from_config(config).unwrap();

    let err = state.complete(request(), RequestContext::new()).await.unwrap_err();

    match err {
        GatewayError::FallbackExhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, GatewayError::RateLimitExceeded { .. }));
        }
        other => panic!("expected FallbackExhausted, got {other}"),
    }
    assert_eq!(primary.completion_calls(), 1);
    assert_eq!(backup.completion_calls(), 1);
}

#[tokio::test]
async fn performance_monitor_records_every_attempt() {
    let primary = MockBackend::builder().failing(1, 429).start().await.unwrap();
    let backup = MockBackend::start().await.unwrap();

    let config = two_provider_config(&primary.base_url(), &backup.base_url(), "[]");
    let state = GatewayState::from_config(config).unwrap();

    state.complete(request(), RequestContext::new()).await.unwrap();

    let primary_metrics = state.performance().get_metrics("primary.gpt-4").unwrap();
    assert_eq!(primary_metrics.request_count, 1);
    assert_eq!(primary_metrics.failure_count, 1);

    let backup_metrics = state.performance().get_metrics("backup.gpt-4").unwrap();
    assert_eq!(backup_metrics.success_count, 1);
}
