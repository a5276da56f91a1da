//! Endpoint handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use std::path::Path;
use uuid::Uuid;

use super::server::AppState;
use crate::api::{
    ChatTurnRequest, ChatTurnResponse, HealthResponse, ImageRequest, ImageResponse, Message, SearchRequest,
    SearchResponse,
};
use crate::error::ServiceError;
use crate::prompt::{assemble, search_context, PromptParts};
use crate::request_log::{format_turn_log, truncate_prefix, LOG_PREFIX_CHARS};
use crate::search::SearchHit;

const INDEX_MISSING: &str = "<h1>index.html not found</h1>";

/// Snippets for a chat turn, or `None` when the caller did not ask for search
async fn turn_snippets(state: &AppState, request: &ChatTurnRequest) -> Option<Vec<String>> {
    if !request.use_search {
        return None;
    }
    Some(
        state
            .search
            .snippets(&request.message, state.config.search.chat_max_results)
            .await,
    )
}

fn turn_messages(state: &AppState, request: &ChatTurnRequest, snippets: Option<&[String]>) -> Vec<Message> {
    let context = snippets.and_then(search_context);
    assemble(PromptParts {
        message: &request.message,
        history: &request.history,
        system_prompt: request.system_prompt.as_deref(),
        default_system_prompt: &state.config.upstream.default_system_prompt,
        search_context: context.as_deref(),
    })
}

/// POST /chat
#[tracing::instrument(name = "chat", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ServiceError> {
    tracing::info!("{}", format_turn_log("/chat", &request));
    tracing::info!(
        message = truncate_prefix(&request.message, LOG_PREFIX_CHARS),
        "/chat user message"
    );

    let snippets = turn_snippets(&state, &request).await;
    let messages = turn_messages(&state, &request, snippets.as_deref());

    let reply = state
        .upstream
        .complete(messages, request.model.as_deref(), request.temperature)
        .await?;
    tracing::info!(reply = truncate_prefix(&reply, LOG_PREFIX_CHARS), "/chat reply");

    let mut history = request.history;
    history.push(Message::user(request.message));
    history.push(Message::assistant(reply.clone()));

    Ok(Json(ChatTurnResponse {
        reply,
        history,
        search_snippets: snippets,
    }))
}

/// POST /chat-stream
///
/// The body is the concatenation of fragments as they arrive. Once the first
/// byte is out the status is fixed, so upstream failures after that point just
/// end the body early.
#[tracing::instrument(name = "chat_stream", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Response, ServiceError> {
    tracing::info!("{}", format_turn_log("/chat-stream", &request));
    tracing::info!(
        message = truncate_prefix(&request.message, LOG_PREFIX_CHARS),
        "/chat-stream user message"
    );

    let snippets = turn_snippets(&state, &request).await;
    let messages = turn_messages(&state, &request, snippets.as_deref());

    let fragments = state
        .upstream
        .stream(messages, request.model.as_deref(), request.temperature)
        .await?;

    let body = Body::from_stream(fragments.map(|fragment| Ok::<Bytes, Infallible>(fragment.into())));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// POST /search
///
/// Unlike chat augmentation, provider errors are reported to the caller.
#[tracing::instrument(name = "search", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ServiceError> {
    if request.query.trim().is_empty() {
        return Ok(Json(SearchResponse { results: Vec::new() }));
    }

    let provider = state.search.provider();
    let hits = provider.search(&request.query, request.max_results).await?;
    tracing::info!(provider = provider.name(), hits = hits.len(), "/search");

    Ok(Json(SearchResponse {
        results: hits.iter().map(SearchHit::to_snippet).collect(),
    }))
}

/// POST /generate-image
#[tracing::instrument(name = "generate_image", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, ServiceError> {
    tracing::info!(prompt = truncate_prefix(&request.prompt, LOG_PREFIX_CHARS), "/generate-image");
    let url = state.image.generate(&request.prompt).await?;
    Ok(Json(ImageResponse { url }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Response {
    let path = Path::new(&state.config.server.static_dir).join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "index.html unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(INDEX_MISSING)).into_response()
        }
    }
}
