mod harness;

use futures_util::StreamExt;
use harness::mock_backend::MockBackend;
use harness::{GatewayServer, single_provider_config};
use prism_core::RequestContext;
use prism_llm::types::{Message, Role};
use prism_llm::{CompletionRequest, GatewayState};

fn stream_request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4".to_owned(),
        messages: vec![Message::text(Role::User, "say hello")],
        max_tokens: None,
        temperature: None,
        top_p: None,
        stop: None,
        stream: true,
        tools: None,
        tool_choice: None,
        user: None,
    }
}

#[tokio::test]
async fn deltas_concatenate_to_the_full_message_in_order() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();

    let (_route, mut stream) = state
        .complete_stream(stream_request(), RequestContext::new())
        .await
        .unwrap();

    let mut collected = String::new();
    let mut final_usage = None;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assert_eq!(chunk.provider, "openai");
        collected.push_str(chunk.first_delta_text());
        if let Some(usage) = chunk.usage {
            final_usage = Some(usage);
        }
    }

    assert_eq!(collected, "Hello world");

    // Usage arrives on the final chunk only
    let usage = final_usage.expect("final chunk carries usage");
    assert!(usage.prompt_tokens > 0);
    assert!(usage.completion_tokens > 0);
}

#[tokio::test]
async fn cancellation_stops_the_stream() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();

    let context = RequestContext::new();
    let cancel = context.cancel.clone();

    let (_route, mut stream) = state.complete_stream(stream_request(), context).await.unwrap();

    // Read one chunk, then cancel; the stream must end without
    // surfacing the remaining buffered chunks
    let first = stream.next().await;
    assert!(first.is_some());

    cancel.cancel();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn http_sse_frames_chunks_and_terminates_with_done() {
    let backend = MockBackend::start().await.unwrap();
    let state = GatewayState::from_config(single_provider_config(&backend.base_url())).unwrap();
    let server = GatewayServer::start(state).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/completions", server.base_url()))
        .json(&serde_json::json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "say hello"}],
            "stream": true
        }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let body = response.text().await.unwrap();
    let payloads: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();

    assert_eq!(*payloads.last().unwrap(), "[DONE]");

    let mut collected = String::new();
    for payload in &payloads[..payloads.len() - 1] {
        let chunk: serde_json::Value = serde_json::from_str(payload).unwrap();
        if let Some(text) = chunk["choices"][0]["delta"]["content"].as_str() {
            collected.push_str(text);
        }
    }
    assert_eq!(collected, "Hello world");
}
