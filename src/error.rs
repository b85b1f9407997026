use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// AuthError
///
/// Failures of the identity lookup itself. A missing or invalid session is not an error
/// (the caller is simply signed out); only an unusable provider is.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity provider failure: {0}")]
    Provider(String),
}

/// AppError
///
/// Error type returned by handlers and the gate middleware. Serialized as
/// `{"error": "<message>"}`, the shape the web client already expects.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Identity lookup failed")]
    IdentityLookup(#[from] AuthError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IdentityLookup(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Provider details stay in the logs.
        if let AppError::IdentityLookup(source) = &self {
            tracing::error!(error = %source, "identity lookup failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
