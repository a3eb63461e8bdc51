//! HTTP Server
//!
//! Public surface of the relay:
//! - `GET /` health check
//! - `GET /{platform}/{rest...}?format=rss|atom|json` feed requests
//! - `GET {image proxy path}?s=..&p=..` image relay (only when configured)

use crate::application::{FeedService, ImageRelay};
use crate::domain::value_objects::OutputFormat;
use crate::infrastructure::shutdown_signal;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

const HEALTH_BANNER: &str = "feed-relay is running";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub feeds: Arc<FeedService>,
    pub relay: Option<Arc<ImageRelay>>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
}

/// HTTP server for feed and image requests.
pub struct HttpServer {
    listen_addr: String,
    state: AppState,
    relay_path: Option<String>,
}

impl HttpServer {
    pub fn new(listen_addr: impl Into<String>, feeds: Arc<FeedService>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            state: AppState { feeds, relay: None },
            relay_path: None,
        }
    }

    /// Serve the image relay under `path`.
    pub fn with_image_relay(mut self, path: impl Into<String>, relay: Arc<ImageRelay>) -> Self {
        self.relay_path = Some(path.into());
        self.state.relay = Some(relay);
        self
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/", get(health_handler))
            .route("/:platform/*rest", get(feed_handler));

        if let Some(path) = &self.relay_path {
            router = router.route(path, get(image_handler));
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::new())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("feed relay listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler() -> &'static str {
    HEALTH_BANNER
}

async fn feed_handler(
    State(state): State<AppState>,
    Path((platform, _rest)): Path<(String, String)>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.host())
        .unwrap_or_default();
    let request_path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let format = OutputFormat::from_query(query.format.as_deref());

    tracing::debug!("feed request platform={} host={} path={}", platform, host, request_path);

    match state.feeds.serve(request_path, &platform, host, format).await {
        Ok(rendered) => (
            [(header::CONTENT_TYPE, rendered.content_type)],
            rendered.body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn image_handler(State(state): State<AppState>, Query(query): Query<ImageQuery>) -> Response {
    let Some(relay) = state.relay else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let platform = query.p.unwrap_or_default();

    let upstream = match relay.relay(query.s.as_deref(), &platform).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!("image proxy src={:?} platform={}: {}", query.s, platform, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    if let Some(value) = upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        builder = builder.header(header::CONTENT_TYPE, value);
    }

    builder
        .body(Body::from_stream(upstream.upstream.bytes_stream()))
        .unwrap_or_else(|e| {
            tracing::error!("failed to build image response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
