//! Axum route handlers for the canonical gateway API
//!
//! `POST /completions` (JSON, or SSE when `stream` is set),
//! `POST /embeddings`, plus `GET /models` and `GET /health` for
//! operators. Errors are RFC 7807 problem+json with `code`,
//! `correlationId`, and provider extensions; the correlation id header
//! is read at ingress, generated when absent, and echoed back.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use http::HeaderValue;
use prism_core::context::CORRELATION_HEADER;
use prism_core::{HttpError, RequestContext};

use crate::error::GatewayError;
use crate::provider::CompletionStream;
use crate::state::GatewayState;
use crate::types::{CompletionRequest, EmbeddingRequest};

/// Build the gateway router with all endpoints
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/completions", post(completions))
        .route("/embeddings", post(embeddings))
        .route("/models", get(models))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(correlation))
        .with_state(state)
}

/// Read or generate the correlation id and echo it on the response
async fn correlation(mut request: axum::extract::Request, next: axum::middleware::Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToOwned::to_owned);

    request
        .extensions_mut()
        .insert(RequestContext::with_correlation_id(correlation_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Handle `POST /completions`
async fn completions(
    State(state): State<GatewayState>,
    axum::Extension(context): axum::Extension<RequestContext>,
    Json(request): Json<CompletionRequest>,
) -> Response {
    let correlation_id = context.correlation_id.clone();

    if request.stream {
        match state.complete_stream(request, context).await {
            Ok((_route, stream)) => sse_response(stream).into_response(),
            Err(e) => problem_response(&e, &correlation_id),
        }
    } else {
        match state.complete(request, context).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => problem_response(&e, &correlation_id),
        }
    }
}

/// Handle `POST /embeddings`
async fn embeddings(
    State(state): State<GatewayState>,
    axum::Extension(context): axum::Extension<RequestContext>,
    Json(request): Json<EmbeddingRequest>,
) -> Response {
    let correlation_id = context.correlation_id.clone();

    match state.embed(request, context).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => problem_response(&e, &correlation_id),
    }
}

/// Handle `GET /models`
async fn models(State(state): State<GatewayState>) -> Response {
    let data: Vec<serde_json::Value> = state
        .list_models()
        .into_iter()
        .map(|m| {
            serde_json::json!({
                "id": m.id,
                "object": "model",
                "provider": m.provider,
                "display_name": m.display_name,
                "context_window": m.context_window,
                "capabilities": {
                    "completions": m.capabilities.completions,
                    "embeddings": m.capabilities.embeddings,
                    "streaming": m.capabilities.streaming,
                    "function_calling": m.capabilities.function_calling,
                    "vision": m.capabilities.vision,
                },
            })
        })
        .collect();

    Json(serde_json::json!({"object": "list", "data": data})).into_response()
}

/// Handle `GET /health`
async fn health(State(state): State<GatewayState>) -> Response {
    let providers: Vec<serde_json::Value> = state
        .health()
        .snapshot()
        .into_iter()
        .map(|h| {
            serde_json::json!({
                "provider": h.provider,
                "available": h.is_available,
                "last_probe": h.last_probe,
                "consecutive_failures": h.consecutive_failures,
            })
        })
        .collect();

    Json(serde_json::json!({"providers": providers})).into_response()
}

/// Frame a canonical chunk stream as `data:` SSE with a `[DONE]` terminator
fn sse_response(stream: CompletionStream) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let event_stream = stream
        .map(|result| match result {
            Ok(chunk) => {
                let data = serde_json::to_string(&chunk).unwrap_or_default();
                Ok(Event::default().data(data))
            }
            Err(e) => {
                let error_data = serde_json::json!({
                    "error": {
                        "message": e.client_message(),
                        "code": e.code(),
                    }
                });
                Ok(Event::default().data(error_data.to_string()))
            }
        })
        .chain(futures_util::stream::once(futures_util::future::ready(Ok(
            Event::default().data("[DONE]"),
        ))));

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Build an RFC 7807 problem+json response
fn problem_response(error: &GatewayError, correlation_id: &str) -> Response {
    let status = error.status_code();

    let mut body = serde_json::json!({
        "type": "about:blank",
        "title": status.canonical_reason().unwrap_or("Error"),
        "status": status.as_u16(),
        "detail": error.client_message(),
        "code": error.code(),
        "correlationId": correlation_id,
    });
    if let Some(provider) = error.provider() {
        body["provider"] = provider.into();
    }
    if let Some(code) = error.provider_error_code() {
        body["providerErrorCode"] = code.into();
    }

    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );
    response
}
