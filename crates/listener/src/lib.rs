//! hookfeed HTTP surface.
//!
//! Binds the [`ingest::IngestionService`] to HTTP with axum:
//!
//! | Route | Method | Behaviour |
//! |-------|--------|-----------|
//! | `/` | GET | Static page that polls `/events` |
//! | `/health` | GET | `204 No Content` |
//! | `/webhook` | POST | Receives a GitHub webhook delivery; answers `{"status": "received"}` |
//! | `/events` | GET | Up to 20 most recent events, newest first |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Header extraction, body decoding, and status-code
//! mapping live here. Whether a delivery is stored is decided entirely by the
//! ingestion service; a body that is not JSON is the only request this layer
//! rejects on its own.
//!
//! Request bodies may be up to [`MAX_WEBHOOK_BODY_BYTES`] (25 MiB, the largest
//! delivery GitHub sends); larger bodies are refused with `413`.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use events::StoredEvent;
use ingest::{IngestError, IngestionService};

/// Header carrying the GitHub event type of a webhook delivery.
pub const EVENT_TYPE_HEADER: &str = "x-github-event";

/// Largest webhook body accepted, matching GitHub's 25 MB delivery cap.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 25 * 1024 * 1024;

const INDEX_PAGE: &str = include_str!("../assets/index.html");

/// Shared state handed to every handler.
pub type AppState = Arc<IngestionService>;

/// Errors that turn into non-2xx responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The webhook body could not be decoded as JSON.
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The delivery was normalized but could not be stored, and the service
    /// is configured to report that to the sender.
    #[error("event could not be recorded: {0}")]
    NotRecorded(#[source] IngestError),

    /// The recent-events listing could not be read from the store.
    #[error("recent events could not be loaded: {0}")]
    ListingFailed(#[source] IngestError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotRecorded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ListingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Acknowledgement body for `POST /webhook`.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
}

impl Acknowledgement {
    fn received() -> Self {
        Self { status: "received" }
    }
}

/// Builds the application router.
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/webhook", post(receive_webhook))
        .route("/events", get(list_events))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    service: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening for webhooks");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn receive_webhook(
    State(service): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Acknowledgement>, ApiError> {
    // A non-UTF-8 header value is treated the same as a missing one.
    let event_type = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|value| value.to_str().ok());

    let payload: Value = serde_json::from_slice(&body).map_err(|error| {
        tracing::warn!(%error, ?event_type, "rejecting webhook with undecodable body");
        ApiError::MalformedBody(error)
    })?;

    service
        .receive_notification(event_type, &payload)
        .await
        .map_err(ApiError::NotRecorded)?;

    Ok(Json(Acknowledgement::received()))
}

async fn list_events(State(service): State<AppState>) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    let events = service.list_recent().await.map_err(ApiError::ListingFailed)?;
    Ok(Json(events))
}
