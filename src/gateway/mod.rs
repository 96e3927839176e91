//! HTTP gateway (Axum) in front of the identification pipeline.
//!
//! This module is primarily used by the `sightline` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ErrorResponse, GatewayError};
pub use handler::{IdentifyForm, identify_handler};
pub use state::HandlerState;

/// Room for multipart framing and the text fields on top of the image limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router_with_state(state: HandlerState) -> Router {
    let body_limit = state
        .max_image_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/identify", post(identify_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}
