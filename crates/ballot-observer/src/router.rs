//! Axum router construction.
//!
//! Assembles the status page, the two SSE streams and the JSON endpoints
//! into a single [`Router`] with CORS open to any origin so the viewing
//! client can be hosted elsewhere.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;
use crate::state::AppState;

/// Build the complete router.
///
/// - `GET /` -- HTML status page
/// - `GET /api/elections/stream` -- legacy summary stream
/// - `GET /api/elections/stream2` -- versioned envelope stream
/// - `GET /api/elections/current` -- current summary
/// - `GET /api/health` -- liveness
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // Streams
        .route("/api/elections/stream", get(sse::legacy_stream))
        .route("/api/elections/stream2", get(sse::versioned_stream))
        // Snapshots
        .route("/api/elections/current", get(handlers::current))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
