use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::ResolvedIdentity,
    error::AppError,
    gate::{Decision, GateRequest},
};

/// File extensions served as static assets; requests for them never reach the gate.
/// `json` is absent so JSON endpoints stay covered.
const STATIC_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "jpg", "jpeg", "webp", "png", "gif", "svg", "ttf", "woff",
    "woff2", "ico", "csv", "doc", "docx", "xls", "xlsx", "zip", "webmanifest",
];

/// is_static_asset
///
/// True for framework internals (`/_next/...`) and for any path containing `.<ext>` with a
/// static extension, wherever it appears and in any case (`/logo.PNG`, `/app.js/map`).
/// `.json` never counts. API paths are always gated, whatever they contain.
pub fn is_static_asset(path: &str) -> bool {
    if path.starts_with("/api") || path.starts_with("/trpc") {
        return false;
    }
    if path.starts_with("/_next") {
        return true;
    }

    let lowered = path.to_ascii_lowercase();
    lowered
        .match_indices('.')
        .map(|(index, _)| &lowered[index + 1..])
        .any(has_static_extension)
}

fn has_static_extension(rest: &str) -> bool {
    STATIC_EXTENSIONS.iter().any(|ext| {
        rest.strip_prefix(ext)
            .is_some_and(|after| !(*ext == "js" && after.starts_with("on")))
    })
}

/// sign_in_location
///
/// The sign-in URL with the original path and query attached as `redirect_url`, so the
/// identity provider can send the caller back after signing in.
pub fn sign_in_location(sign_in_url: &str, original: &Uri) -> String {
    let target = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| original.path());

    match serde_urlencoded::to_string(&[("redirect_url", target)]) {
        Ok(query) => {
            let separator = if sign_in_url.contains('?') { '&' } else { '?' };
            format!("{sign_in_url}{separator}{query}")
        }
        Err(_) => sign_in_url.to_string(),
    }
}

/// access_gate
///
/// Runs the `AccessGate` for every request routed through the application.
///
/// Public paths pass without touching the identity provider. For everything else the
/// caller is resolved (the one await in this path; failures surface as `502`), the decision
/// is taken and mapped onto HTTP: pass through, or a `307` redirect. On pass-through the
/// resolved identity rides along in the request extensions for the `AuthUser` extractor.
pub async fn access_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    if is_static_asset(&path) || state.gate.is_public(&path) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let identity = state.identity.resolve(&parts).await?;

    let gate_request = GateRequest { path, identity };
    let decision = state.gate.decide(&gate_request);

    match decision {
        Decision::Continue => {
            tracing::debug!(path = %gate_request.path, "access granted");
            parts.extensions.insert(ResolvedIdentity(gate_request.identity));
            Ok(next.run(Request::from_parts(parts, body)).await)
        }
        Decision::RedirectToSignIn => {
            tracing::info!(path = %gate_request.path, "anonymous request redirected to sign-in");
            let location = sign_in_location(&state.config.sign_in_url, &parts.uri);
            Ok(Redirect::temporary(&location).into_response())
        }
        Decision::RedirectToPath(target) => {
            tracing::info!(
                path = %gate_request.path,
                target = %target,
                "request redirected for insufficient role"
            );
            Ok(Redirect::temporary(&target).into_response())
        }
    }
}
