use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    AppState,
    analysis::{mock_analysis, new_analysis_id},
    auth::AuthUser,
    error::AppError,
    gate::Role,
    models::{AnalysisEntry, AnalysisResponse, ErrorResponse, UploadResponse},
};

/// AnalysisQuery
///
/// Query parameters for `GET /api/ai-analysis`.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalysisQuery {
    /// The id returned by the upload endpoint.
    pub id: Option<String>,
}

/// upload_solution
///
/// [Authenticated Route] Accepts a multipart form with a `file` field (image or PDF of a
/// handwritten solution), runs the mock grader, stores the result and answers after the
/// configured processing delay.
#[utoipa::path(
    post,
    path = "/api/ai-analysis",
    request_body(content = String, content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 200, description = "Analysis stored", body = UploadResponse),
        (status = 400, description = "No file provided", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn upload_solution(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut filename = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        // The upload itself is not kept; drain it so the body is fully read.
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        tracing::debug!(filename = %name, size = bytes.len(), "received solution upload");
        filename = Some(name);
    }

    let filename = filename.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let now = Utc::now();
    let analysis_id = new_analysis_id(now);
    let analysis = mock_analysis(&user_id, &filename, now);

    state.repo.insert(analysis_id.clone(), analysis).await;
    tracing::info!(analysis_id = %analysis_id, user_id = %user_id, "analysis stored");

    if !state.config.analysis_delay.is_zero() {
        tokio::time::sleep(state.config.analysis_delay).await;
    }

    Ok(Json(UploadResponse {
        success: true,
        analysis_id,
        message: "File uploaded and analysis started".to_string(),
    }))
}

/// get_analysis
///
/// [Authenticated Route] Returns one analysis. Only its owner may read it; anyone else gets
/// the same `401` as an anonymous caller.
#[utoipa::path(
    get,
    path = "/api/ai-analysis",
    params(AnalysisQuery),
    responses(
        (status = 200, description = "Found", body = AnalysisResponse),
        (status = 400, description = "No analysis ID provided", body = ErrorResponse),
        (status = 401, description = "Not signed in or not the owner", body = ErrorResponse),
        (status = 404, description = "Analysis not found", body = ErrorResponse)
    )
)]
pub async fn get_analysis(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let analysis_id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("No analysis ID provided".to_string()))?;

    let analysis = state
        .repo
        .get(&analysis_id)
        .await
        .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;

    if analysis.user_id != user_id {
        tracing::warn!(analysis_id = %analysis_id, user_id = %user_id, "analysis requested by non-owner");
        return Err(AppError::Unauthorized);
    }

    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}

/// list_my_analyses
///
/// [Authenticated Route] The caller's upload history, newest first.
#[utoipa::path(
    get,
    path = "/api/analyses",
    responses(
        (status = 200, description = "My analyses", body = [AnalysisEntry]),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn list_my_analyses(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<AnalysisEntry>> {
    Json(state.repo.list_for_user(&id).await)
}

/// list_all_analyses
///
/// [Teacher Route] Every stored analysis, newest first.
///
/// *Authorization*: checks the resolved role in the handler; students get `403`.
#[utoipa::path(
    get,
    path = "/api/teacher/analyses",
    responses(
        (status = 200, description = "All analyses", body = [AnalysisEntry]),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not a teacher", body = ErrorResponse)
    )
)]
pub async fn list_all_analyses(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnalysisEntry>>, AppError> {
    if role != Role::Teacher {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.repo.list_all().await))
}
