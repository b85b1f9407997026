use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header, request::Parts},
    response::Response,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use math_feedback::{
    AppConfig, AppState, AuthError, IdentityProvider, create_router,
    auth::{Claims, SessionMetadata},
    gate::{AccessGate, Identity},
    models::{AnalysisEntry, AnalysisResponse, ErrorResponse, UploadResponse},
    repository::InMemoryRepository,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};
use tower::util::ServiceExt;

// --- Stub Identity Provider ---

/// Provider that is always down, counting how often it was asked.
#[derive(Default)]
struct UnavailableProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for UnavailableProvider {
    async fn resolve(&self, _parts: &Parts) -> Result<Option<Identity>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::Provider("connection refused".to_string()))
    }
}

// --- Helpers ---

const BOUNDARY: &str = "XSOLUTIONBOUNDARY";

fn app() -> axum::Router {
    create_router(AppState::from_config(AppConfig::default()))
}

/// Callers used across the tests. Students sign in through the local `x-user-id` bypass;
/// teachers need a signed session carrying the role claim.
#[derive(Clone, Copy)]
enum Caller {
    Student(&'static str),
    Teacher(&'static str),
}

impl Caller {
    fn id(&self) -> &'static str {
        match self {
            Caller::Student(id) | Caller::Teacher(id) => id,
        }
    }
}

fn teacher_token(user_id: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 3600,
        metadata: Some(SessionMetadata {
            role: Some("teacher".to_string()),
        }),
    };
    let key = EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn signed_in(
    builder: axum::http::request::Builder,
    caller: Option<Caller>,
) -> axum::http::request::Builder {
    match caller {
        Some(Caller::Student(id)) => builder.header("x-user-id", id),
        Some(Caller::Teacher(id)) => {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", teacher_token(id)))
        }
        None => builder,
    }
}

fn get(uri: &str, caller: Option<Caller>) -> Request<Body> {
    signed_in(Request::builder().method("GET").uri(uri), caller)
        .body(Body::empty())
        .unwrap()
}

fn multipart_body(field_name: &str, filename: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{BOUNDARY}--\r\n"
    )
}

fn upload(field_name: &str, caller: Option<Caller>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/api/ai-analysis")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    signed_in(builder, caller)
        .body(Body::from(multipart_body(field_name, "solution.png")))
        .unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap()
}

const STUDENT: Caller = Caller::Student("student-1");
const OTHER_STUDENT: Caller = Caller::Student("student-2");
const TEACHER: Caller = Caller::Teacher("teacher-1");

// --- Gate Behaviour over HTTP ---

#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_sign_in() {
    let response = app()
        .oneshot(get("/dashboard/history", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/sign-in?redirect_url=%2Fdashboard%2Fhistory"
    );
}

#[tokio::test]
async fn test_sign_in_redirect_keeps_query_string() {
    let response = app()
        .oneshot(get("/results/abc?tab=steps", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/sign-in?redirect_url=%2Fresults%2Fabc%3Ftab%3Dsteps"
    );
}

#[tokio::test]
async fn test_student_on_teacher_page_redirects_to_dashboard() {
    let response = app()
        .oneshot(get("/teacher/reports", Some(STUDENT)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_teacher_passes_teacher_gate() {
    let response = app().oneshot(get("/teacher", Some(TEACHER))).await.unwrap();

    // No page is rendered here; passing the gate lands on the JSON fallback.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Not found");
}

#[tokio::test]
async fn test_role_header_does_not_grant_teacher_access() {
    let claimed_teacher = |uri: &str| {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("x-user-id", "student-1")
            .header("x-user-role", "teacher")
            .body(Body::empty())
            .unwrap()
    };

    let response = app()
        .oneshot(claimed_teacher("/api/teacher/analyses"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app().oneshot(claimed_teacher("/teacher")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_gate_ignores_case_and_trailing_slash() {
    let response = app().oneshot(get("/Dashboard/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let response = app()
        .oneshot(get("/TEACHER/reports", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");

    let response = app().oneshot(get("/teacher-login/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_and_static_paths_are_not_redirected() {
    for uri in ["/", "/sign-in/factor-two", "/dashboard/logo.png", "/_next/static/app.js"] {
        let response = app().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_identity_failure_surfaces_as_bad_gateway() {
    let provider = Arc::new(UnavailableProvider::default());
    let config = AppConfig::default();
    let state = AppState {
        gate: Arc::new(AccessGate::default()),
        identity: provider.clone(),
        repo: Arc::new(InMemoryRepository::new()),
        config,
    };
    let app = create_router(state);

    let response = app.clone().oneshot(get("/dashboard", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Identity lookup failed");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // Public paths never consult the provider.
    let response = app.oneshot(get("/about", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_health_check() {
    let response = app().oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

// --- Analysis API ---

#[tokio::test]
async fn test_upload_requires_sign_in() {
    let response = app().oneshot(upload("file", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Unauthorized");
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let response = app()
        .oneshot(upload("attachment", Some(STUDENT)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "No file provided");
}

#[tokio::test]
async fn test_upload_then_fetch_as_owner() {
    let app = app();

    let response = app
        .clone()
        .oneshot(upload("file", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded: UploadResponse = json_body(response).await;
    assert!(uploaded.success);
    assert!(uploaded.analysis_id.starts_with("analysis_"));
    assert_eq!(uploaded.message, "File uploaded and analysis started");

    let response = app
        .oneshot(get(
            &format!("/api/ai-analysis?id={}", uploaded.analysis_id),
            Some(STUDENT),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: AnalysisResponse = json_body(response).await;
    assert!(fetched.success);
    assert_eq!(fetched.analysis.user_id, STUDENT.id());
    assert_eq!(fetched.analysis.filename, "solution.png");
    assert_eq!(fetched.analysis.steps.len(), 4);
}

#[tokio::test]
async fn test_fetch_rejects_non_owner_and_bad_ids() {
    let app = app();

    let response = app
        .clone()
        .oneshot(upload("file", Some(STUDENT)))
        .await
        .unwrap();
    let uploaded: UploadResponse = json_body(response).await;

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/ai-analysis?id={}", uploaded.analysis_id),
            Some(OTHER_STUDENT),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/ai-analysis", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "No analysis ID provided");

    let response = app
        .oneshot(get("/api/ai-analysis?id=analysis_0_missing", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Analysis not found");
}

#[tokio::test]
async fn test_history_and_teacher_overview() {
    let app = app();

    for user in [STUDENT, STUDENT, OTHER_STUDENT] {
        let response = app.clone().oneshot(upload("file", Some(user))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/api/analyses", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mine: Vec<AnalysisEntry> = json_body(response).await;
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|entry| entry.analysis.user_id == STUDENT.id()));

    let response = app
        .clone()
        .oneshot(get("/api/teacher/analyses", Some(STUDENT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get("/api/teacher/analyses", Some(TEACHER)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let all: Vec<AnalysisEntry> = json_body(response).await;
    assert_eq!(all.len(), 3);
}
