//! Router, shared state and the listener loop

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handler;
use crate::config::{AppConfig, Secrets};
use crate::image::ImageClient;
use crate::search::{DuckDuckGoProvider, SearchAugmenter, SearchProvider};
use crate::upstream::UpstreamClient;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: UpstreamClient,
    pub search: SearchAugmenter,
    pub image: ImageClient,
}

impl AppState {
    /// Wire up the production providers
    pub fn new(config: AppConfig, secrets: Secrets) -> Result<Self, reqwest::Error> {
        let http_client = build_http_client()?;
        let provider = Arc::new(DuckDuckGoProvider::new(http_client.clone(), config.search.url.clone()));
        Ok(Self::with_provider(config, secrets, http_client, provider))
    }

    /// Same as [`AppState::new`] with a caller-chosen search provider
    pub fn with_provider(
        config: AppConfig,
        secrets: Secrets,
        http_client: reqwest::Client,
        provider: Arc<dyn SearchProvider>,
    ) -> Self {
        let upstream = UpstreamClient::new(
            http_client.clone(),
            config.upstream.clone(),
            secrets.completion_api_key,
        );
        let image = ImageClient::new(http_client, config.image.clone(), secrets.image_api_key);

        Self {
            config: Arc::new(config),
            upstream,
            search: SearchAugmenter::new(provider),
            image,
        }
    }
}

/// Shared HTTP client. No global timeout: streaming replies may run for minutes.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().pool_max_idle_per_host(10).build()
}

/// Build the full router for `state`
pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/chat", post(handler::chat))
        .route("/chat-stream", post(handler::chat_stream))
        .route("/search", post(handler::search))
        .route("/generate-image", post(handler::generate_image))
        .nest_service("/static", static_dir)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay until the listener fails
pub async fn run_server(config: AppConfig, secrets: Secrets) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let upstream_url = config.upstream.base_url().to_string();

    let state = AppState::new(config, secrets)?;
    let image_enabled = state.image.is_configured();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("chat-relay listening on {}", addr);
    tracing::info!("Relaying completions to {}", upstream_url);
    if !image_enabled {
        tracing::warn!("IMAGE_API_KEY not set, /generate-image will answer with an error");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
