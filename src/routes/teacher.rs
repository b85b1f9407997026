use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Teacher Router Module
///
/// Mounted under `/api/teacher`. The role check happens inside each handler once the
/// caller has been authenticated.
pub fn teacher_routes() -> Router<AppState> {
    Router::new()
        // GET /api/teacher/analyses
        // Every stored analysis, for the class overview.
        .route("/analyses", get(handlers::list_all_analyses))
}
