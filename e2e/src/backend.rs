//! Mock providers: completion API, DuckDuckGo-style search and image generation
//!
//! One axum server plays all three. Tests pre-configure responses via
//! SharedBackendState before each request.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{BackendState, MockResponse, Provider, ReceivedRequest, SharedBackendState};

/// Default fallback completion when no response is queued
fn default_completion_response() -> MockResponse {
    MockResponse::json(
        r#"{"id":"chatcmpl-default","object":"chat.completion","created":1700000000,"model":"test-model","choices":[{"index":0,"message":{"role":"assistant","content":"Default response (no mock queued)"},"finish_reason":"stop"}]}"#,
    )
}

/// Default search answer: no abstract, no topics
fn default_search_response() -> MockResponse {
    MockResponse::json(r#"{"Heading":"","AbstractText":"","AbstractURL":"","RelatedTopics":[]}"#)
}

fn default_image_response() -> MockResponse {
    MockResponse::json(r#"{"status":"success","output":["http://127.0.0.1/default.png"]}"#)
}

/// Record the request, then pop the next queued response for `provider`
async fn serve(state: SharedBackendState, provider: Provider, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body_bytes = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap_or_default();
    let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    let mock_response = {
        let mut state = state.lock().unwrap();
        let queued = state.record(ReceivedRequest {
            provider,
            path,
            query,
            authorization,
            body,
        });
        queued.unwrap_or_else(|| match provider {
            Provider::Completion => default_completion_response(),
            Provider::Search => default_search_response(),
            Provider::Image => default_image_response(),
        })
    };

    let status = StatusCode::from_u16(mock_response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, mock_response.content_type)],
        mock_response.body,
    )
        .into_response()
}

/// Handle POST /v1/chat/completions
async fn handle_chat_completions(State(state): State<SharedBackendState>, request: Request<Body>) -> Response {
    serve(state, Provider::Completion, request).await
}

/// Handle GET /search/ (instant answer API shape)
async fn handle_search(State(state): State<SharedBackendState>, request: Request<Body>) -> Response {
    serve(state, Provider::Search, request).await
}

/// Handle POST /image
async fn handle_image(State(state): State<SharedBackendState>, request: Request<Body>) -> Response {
    serve(state, Provider::Image, request).await
}

/// Start the mock provider server and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state: SharedBackendState = std::sync::Arc::new(std::sync::Mutex::new(BackendState::default()));

    let app = Router::new()
        .route(Provider::Completion.route(), post(handle_chat_completions))
        .route(Provider::Search.route(), get(handle_search))
        .route(Provider::Image.route(), post(handle_image))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock providers to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock provider server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Queue the next response for one provider
pub fn queue_response(state: &SharedBackendState, provider: Provider, response: MockResponse) {
    state.lock().unwrap().queue_mut(provider).push_back(response);
}

/// Take all requests received for `provider` since the last reset
pub fn drain_requests(state: &SharedBackendState, provider: Provider) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    let (matching, rest): (Vec<_>, Vec<_>) = s.received_requests.drain(..).partition(|r| r.provider == provider);
    s.received_requests = rest;
    matching
}
