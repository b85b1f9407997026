use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Student-facing API. Every handler takes an `AuthUser`, so anonymous callers get `401`
/// before any handler logic runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/ai-analysis  (multipart upload, returns the new analysis id)
        // GET  /api/ai-analysis?id=...  (owner-only fetch)
        .route(
            "/api/ai-analysis",
            get(handlers::get_analysis).post(handlers::upload_solution),
        )
        // GET /api/analyses
        // The caller's history, backing the student dashboard.
        .route("/api/analyses", get(handlers::list_my_analyses))
}
