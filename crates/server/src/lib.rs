//! DevTrack REST API Server Library
//!
//! Serves the ticket tracker over HTTP so the web dashboard and scripts can
//! create, browse, and advance tickets.

pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use devtrack::{TicketService, TicketStore};

// Re-export for convenience
pub use routes::create_routes;

/// Plain-text banner served at `/`.
pub const BANNER: &str = "DevTrackHub backend is running!";

/// Full application: banner at `/`, ticket API under `/api`, permissive
/// CORS for the browser dashboard, and request tracing.
pub fn build_app<S: TicketStore + 'static>(service: Arc<TicketService<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { BANNER }))
        .nest("/api", create_routes(service))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
