// Web server: axum-based modifier endpoint.
//
// POST /format-message (and the legacy /target_url) runs the moderator.
// GET /health reports liveness and, optionally, provider connectivity.
// GET /integration.json serves the static integration descriptor.
// Every error path answers with a JSON ModerationError, panics included.
// Arrival is stamped by middleware before the body is read, so the time
// budget covers body transfer too.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::integration::IntegrationDescriptor;
use crate::moderation::models::{ErrorCode, ModerationError};
use crate::moderation::MessageModerator;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub moderator: Arc<MessageModerator>,
    pub descriptor: Arc<IntegrationDescriptor>,
    /// Probe the sentiment provider from /health
    pub check_provider_health: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        moderator: MessageModerator,
        descriptor: IntegrationDescriptor,
        check_provider_health: bool,
    ) -> Self {
        Self {
            moderator: Arc::new(moderator),
            descriptor: Arc::new(descriptor),
            check_provider_health,
            started_at: Instant::now(),
        }
    }
}

/// When the request head reached the router.
#[derive(Debug, Clone, Copy)]
pub struct RequestArrival(pub tokio::time::Instant);

async fn stamp_arrival(mut request: Request, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(RequestArrival(tokio::time::Instant::now()));
    next.run(request).await
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState, port: u16, bind: &str) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("Telex sentiment modifier listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/format-message", post(handlers::moderate::format_message))
        .route("/target_url", post(handlers::moderate::format_message))
        .route("/health", get(handlers::health::health))
        .route(
            "/integration.json",
            get(handlers::integration::integration_json),
        )
        .route(
            "/integration-json",
            get(handlers::integration::integration_json),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(stamp_arrival))
        .with_state(state)
}

/// HTTP status for each error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidMessage | ErrorCode::InvalidChannel | ErrorCode::InvalidTargetUrl => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::TimeoutError => StatusCode::REQUEST_TIMEOUT,
        ErrorCode::ProcessingError | ErrorCode::ApiError | ErrorCode::AwsError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error response helper.
pub fn api_error(status: StatusCode, error: ModerationError) -> Response {
    (status, Json(error)).into_response()
}

/// A handler panicked; answer 500 PROCESSING_ERROR instead of dropping the connection.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown error occurred".to_string()
    };
    error!(details = %details, "Handler panicked");

    let mut response = api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ModerationError::new(ErrorCode::ProcessingError, "Processing failed", details),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}
