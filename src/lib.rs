use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware::from_fn_with_state};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route-access decision logic and the middleware that applies it.
pub mod gate;
pub mod middleware;

// Identity resolution, configuration and error mapping.
pub mod auth;
pub mod config;
pub mod error;

// Mock analysis API.
pub mod analysis;
pub mod handlers;
pub mod models;
pub mod repository;

pub mod routes;
use routes::{authenticated, public, teacher};

// --- Public Re-exports ---

pub use auth::{IdentityProvider, IdentityState, JwtIdentityProvider};
pub use config::AppConfig;
pub use error::{AppError, AuthError};
pub use gate::{AccessGate, Decision, GateRequest, Identity, Role, RouteClass, RouteTable};
pub use repository::{InMemoryRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI description of the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upload_solution, handlers::get_analysis,
        handlers::list_my_analyses, handlers::list_all_analyses
    ),
    components(
        schemas(
            models::Analysis, models::SolutionStep, models::Misconception, models::Impact,
            models::UploadResponse, models::AnalysisResponse, models::AnalysisEntry,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "math-feedback", description = "Handwritten solution feedback API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for everything a request may need.
#[derive(Clone)]
pub struct AppState {
    /// Route-access rules.
    pub gate: Arc<AccessGate>,
    /// Resolves the caller from session tokens.
    pub identity: IdentityState,
    /// Analysis storage.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    /// from_config
    ///
    /// Standard wiring: JWT identity provider, in-memory storage and the standard route
    /// table with the configured default redirect.
    pub fn from_config(config: AppConfig) -> Self {
        let gate = AccessGate::new(RouteTable::standard(), config.default_redirect.clone());
        Self {
            gate: Arc::new(gate),
            identity: Arc::new(JwtIdentityProvider::new(&config)),
            repo: Arc::new(InMemoryRepository::new()),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// create_router
///
/// Assembles the routes, puts every one of them (fallback included) behind the access gate,
/// and wraps the result in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/api/teacher", teacher::teacher_routes())
        .fallback(not_found)
        // The gate must be added after the fallback so unknown pages are covered too.
        .layer(from_fn_with_state(state.clone(), middleware::access_gate))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying method, URI and the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
