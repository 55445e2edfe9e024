//! Mock OpenAI-format backend returning canned responses
//!
//! Supports scripted failures (status + count), custom streaming deltas,
//! and embeddings sized to the request input.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Scripted mock backend
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<BackendState>,
}

struct BackendState {
    /// Requests to fail before succeeding (0 = never fail)
    fail_count: AtomicU32,
    /// Status to fail with
    fail_status: AtomicU16,
    completion_calls: AtomicU32,
    embedding_calls: AtomicU32,
    /// Streaming deltas, joined in order
    stream_deltas: Vec<String>,
    /// Non-streaming response content
    content: String,
}

impl MockBackend {
    /// A backend that always succeeds with a fixed response
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Start configuring a backend
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder {
            fail_count: 0,
            fail_status: 500,
            stream_deltas: vec!["Hel", "lo", "", " wo", "rld"].into_iter().map(String::from).collect(),
            content: "Hello world".to_owned(),
        }
    }

    /// Base URL including `/v1`, ready to use as a provider `base_url`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Completion requests received so far
    pub fn completion_calls(&self) -> u32 {
        self.state.completion_calls.load(Ordering::Relaxed)
    }

    /// Embedding requests received so far
    pub fn embedding_calls(&self) -> u32 {
        self.state.embedding_calls.load(Ordering::Relaxed)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Builder for a scripted backend
pub struct MockBackendBuilder {
    fail_count: u32,
    fail_status: u16,
    stream_deltas: Vec<String>,
    content: String,
}

impl MockBackendBuilder {
    /// Fail the first `count` completion requests with `status`
    pub fn failing(mut self, count: u32, status: u16) -> Self {
        self.fail_count = count;
        self.fail_status = status;
        self
    }

    /// Use a custom non-streaming response content
    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_owned();
        self
    }

    /// Bind and serve
    pub async fn start(self) -> anyhow::Result<MockBackend> {
        let state = Arc::new(BackendState {
            fail_count: AtomicU32::new(self.fail_count),
            fail_status: AtomicU16::new(self.fail_status),
            completion_calls: AtomicU32::new(0),
            embedding_calls: AtomicU32::new(0),
            stream_deltas: self.stream_deltas,
            content: self.content,
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(list_models))
            .route("/v1/embeddings", post(embeddings))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    token.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockBackend { addr, shutdown, state })
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    #[serde(default)]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

async fn chat_completions(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<ChatRequest>,
) -> axum::response::Response {
    state.completion_calls.fetch_add(1, Ordering::Relaxed);

    let remaining = state.fail_count.load(Ordering::Relaxed);
    if remaining > 0 {
        state.fail_count.fetch_sub(1, Ordering::Relaxed);
        let status = StatusCode::from_u16(state.fail_status.load(Ordering::Relaxed))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (
            status,
            Json(serde_json::json!({
                "error": {"message": "scripted failure", "type": "server_error"}
            })),
        )
            .into_response();
    }

    if request.stream.unwrap_or(false) {
        return stream_response(&state, &request.model);
    }

    Json(serde_json::json!({
        "id": "chatcmpl-mock-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": request.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .into_response()
}

/// Assemble the SSE body: one role chunk, scripted deltas, a finish
/// chunk, a trailing usage chunk, then `[DONE]`
fn stream_response(state: &BackendState, model: &str) -> axum::response::Response {
    let mut body = String::new();
    let id = "chatcmpl-mock-stream";

    let mut push = |value: serde_json::Value| {
        body.push_str(&format!("data: {value}\n\n"));
    };

    push(serde_json::json!({
        "id": id, "object": "chat.completion.chunk", "created": 1_700_000_000, "model": model,
        "choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}, "finish_reason": null}]
    }));

    for delta in &state.stream_deltas {
        push(serde_json::json!({
            "id": id, "object": "chat.completion.chunk", "created": 1_700_000_000, "model": model,
            "choices": [{"index": 0, "delta": {"content": delta}, "finish_reason": null}]
        }));
    }

    push(serde_json::json!({
        "id": id, "object": "chat.completion.chunk", "created": 1_700_000_000, "model": model,
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    }));

    push(serde_json::json!({
        "id": id, "object": "chat.completion.chunk", "created": 1_700_000_000, "model": model,
        "choices": [],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }));

    body.push_str("data: [DONE]\n\n");

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
        .into_response()
}

async fn list_models(State(state): State<Arc<BackendState>>) -> axum::response::Response {
    let _ = &state;
    Json(serde_json::json!({
        "object": "list",
        "data": [{"id": "mock-model-1", "object": "model", "created": 1_700_000_000, "owned_by": "mock"}]
    }))
    .into_response()
}

async fn embeddings(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<EmbeddingsRequest>,
) -> axum::response::Response {
    state.embedding_calls.fetch_add(1, Ordering::Relaxed);

    let data: Vec<serde_json::Value> = request
        .input
        .iter()
        .enumerate()
        .map(|(index, _)| {
            serde_json::json!({
                "object": "embedding",
                "embedding": [0.1, 0.2, 0.3, 0.4],
                "index": index
            })
        })
        .collect();

    Json(serde_json::json!({
        "object": "list",
        "data": data,
        "model": request.model,
        "usage": {"prompt_tokens": 8, "total_tokens": 8}
    }))
    .into_response()
}
