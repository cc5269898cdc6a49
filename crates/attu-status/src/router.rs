//! Axum router construction for the status API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::StatusState;

/// Build the status router.
///
/// - `GET /health` -- liveness probe
/// - `GET /api/year` -- current year and next rollover
/// - `GET /api/year/{year}` -- span of one year
/// - `GET /api/guard` -- what the daily timer would decide right now
pub fn build_router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/year", get(handlers::current_year))
        .route("/api/year/{year}", get(handlers::year_span))
        .route("/api/guard", get(handlers::guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
