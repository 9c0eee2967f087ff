//! HTTP serving of published composites.
//!
//! `GET /<collection>.png` answers with the current composite of that
//! collection. The PNG is encoded once at publication, so nothing is composed
//! or encoded on the request path.

use crate::core::config::ServerConfig;
use crate::core::error::ServeError;
use crate::refresh::slot::SlotRegistry;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

#[derive(Clone)]
struct AppState {
    slots: Arc<SlotRegistry>,
}

/// Build the router over `slots`, bounded by the configured timeouts.
pub fn router(slots: Arc<SlotRegistry>, config: &ServerConfig) -> Router {
    with_timeouts(
        Router::new()
            .route("/health", get(health))
            .route("/:file", get(serve_collection))
            .with_state(AppState { slots }),
        config,
    )
}

/// Bind and serve until the process exits.
pub async fn serve(config: &ServerConfig, slots: Arc<SlotRegistry>) -> std::io::Result<()> {
    let listener =
        tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port)).await?;
    log::info!(
        "serving collages on http://{} (read timeout {}s, write timeout {}s)",
        listener.local_addr()?,
        config.read_timeout_seconds,
        config.write_timeout_seconds
    );
    axum::serve(listener, router(slots, config)).await
}

/// Reading a request body is bounded by the read timeout; producing the
/// whole response is bounded by the write timeout and answers 408 on expiry.
fn with_timeouts(router: Router, config: &ServerConfig) -> Router {
    router
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout()))
        .layer(TimeoutLayer::new(config.write_timeout()))
}

async fn health() -> &'static str {
    "ok"
}

async fn serve_collection(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    match render_png(&state.slots, &file) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-cache, max-age=0"),
            ],
            bytes,
        )
            .into_response(),
        Err(error) => {
            log::warn!("GET /{} failed: {}", file, error);
            error.into_response()
        }
    }
}

fn render_png(slots: &SlotRegistry, file: &str) -> Result<Bytes, ServeError> {
    let name = file
        .strip_suffix(".png")
        .ok_or_else(|| ServeError::UnknownCollection(file.to_string()))?;
    let slot = slots
        .get(name)
        .ok_or_else(|| ServeError::UnknownCollection(name.to_string()))?;
    slot.png()
        .ok_or_else(|| ServeError::NotReady(name.to_string()))
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = match self {
            ServeError::UnknownCollection(_) => StatusCode::NOT_FOUND,
            ServeError::NotReady(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
