use serde::{Deserialize, Serialize};

/// Role
///
/// The caller's role as carried in the session claims. Anything other than an explicit
/// "teacher" claim resolves to `Student`, which is also the default for callers without a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

impl Role {
    /// from_claim
    ///
    /// Maps the raw role string from a session's metadata claim onto a `Role`.
    pub fn from_claim(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "teacher" => Role::Teacher,
            _ => Role::Student,
        }
    }
}

/// Identity
///
/// The resolved identity of an authenticated caller. `role` stays `None` when the session
/// carries no role claim; the gate treats that as a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Option<Role>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// The effective role, defaulting an unset claim to `Role::Student`.
    pub fn effective_role(&self) -> Role {
        self.role.unwrap_or_default()
    }
}

/// GateRequest
///
/// Everything the gate needs to answer one inbound request. Built by the middleware,
/// consumed by a single `AccessGate::decide` call and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    pub path: String,
    pub identity: Option<Identity>,
}

impl GateRequest {
    pub fn anonymous(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identity: None,
        }
    }

    pub fn authenticated(path: impl Into<String>, identity: Identity) -> Self {
        Self {
            path: path.into(),
            identity: Some(identity),
        }
    }
}

/// RouteClass
///
/// The access label derived from a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable without a session.
    Public,
    /// Requires a session.
    Protected,
    /// Requires a session whose role is `Role::Teacher`.
    TeacherOnly,
}

/// Pattern
///
/// A single path matcher. `Prefix` corresponds to the `/section(.*)` form and matches any
/// path that starts with the given string, including the bare section itself.
/// Patterns are stored lowercase and expect a path already passed through `normalize_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    pub fn exact(path: &str) -> Self {
        Pattern::Exact(path.to_ascii_lowercase())
    }

    pub fn prefix(path: &str) -> Self {
        Pattern::Prefix(path.to_ascii_lowercase())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == p,
            Pattern::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// normalize_path
///
/// Lowercases the path and drops a single trailing `/` (the root stays `/`), so that
/// `/Teacher-Login/` and `/teacher-login` classify the same way.
pub fn normalize_path(path: &str) -> String {
    let lowered = path.to_ascii_lowercase();
    match lowered.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => lowered,
    }
}

/// Decision
///
/// The gate's answer for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue,
    RedirectToSignIn,
    RedirectToPath(String),
}

/// RouteTable
///
/// Ordered `(class, pattern)` pairs evaluated top-to-bottom; the first match wins.
/// Public entries must come first so that a public path (e.g. `/teacher-login`) is never
/// captured by a broader protected or teacher-only prefix.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<(RouteClass, Pattern)>,
}

impl RouteTable {
    pub fn new(entries: Vec<(RouteClass, Pattern)>) -> Self {
        Self { entries }
    }

    /// standard
    ///
    /// The application's route map. Teacher-only precedes protected so that `/teacher/...`
    /// is labelled with the stricter class.
    pub fn standard() -> Self {
        use RouteClass::*;

        Self::new(vec![
            (Public, Pattern::exact("/")),
            (Public, Pattern::exact("/home")),
            (Public, Pattern::exact("/about")),
            (Public, Pattern::exact("/pricing")),
            (Public, Pattern::exact("/teacher-login")),
            (Public, Pattern::prefix("/sign-in")),
            (Public, Pattern::prefix("/sign-up")),
            (TeacherOnly, Pattern::prefix("/teacher")),
            (Protected, Pattern::prefix("/dashboard")),
            (Protected, Pattern::prefix("/upload")),
            (Protected, Pattern::prefix("/results")),
        ])
    }

    /// classify
    ///
    /// Returns the class of the first matching entry, or `None` for paths the table does not
    /// mention (API routes, health checks, unknown pages). Matching ignores ASCII case and
    /// one trailing slash.
    pub fn classify(&self, path: &str) -> Option<RouteClass> {
        let path = normalize_path(path);
        self.entries
            .iter()
            .find(|(_, pattern)| pattern.matches(&path))
            .map(|(class, _)| *class)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// AccessGate
///
/// Pure route-access decision logic. Holds only static configuration, so a single instance
/// is shared by every request.
#[derive(Debug, Clone)]
pub struct AccessGate {
    routes: RouteTable,
    default_redirect: String,
}

pub const DEFAULT_REDIRECT: &str = "/dashboard";

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(RouteTable::standard(), DEFAULT_REDIRECT)
    }
}

impl AccessGate {
    pub fn new(routes: RouteTable, default_redirect: impl Into<String>) -> Self {
        Self {
            routes,
            default_redirect: default_redirect.into(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.routes.classify(path) == Some(RouteClass::Public)
    }

    /// decide
    ///
    /// Maps a request onto a `Decision`:
    /// 1. Public paths always continue, whoever is asking.
    /// 2. Protected and teacher-only paths send anonymous callers to sign-in.
    /// 3. Teacher-only paths send authenticated non-teachers to the default page.
    /// 4. Everything else continues.
    pub fn decide(&self, request: &GateRequest) -> Decision {
        let class = self.routes.classify(&request.path);

        match (class, &request.identity) {
            (Some(RouteClass::Public), _) | (None, _) => Decision::Continue,
            (Some(RouteClass::Protected | RouteClass::TeacherOnly), None) => {
                Decision::RedirectToSignIn
            }
            (Some(RouteClass::TeacherOnly), Some(identity)) => {
                if identity.effective_role() == Role::Teacher {
                    Decision::Continue
                } else {
                    Decision::RedirectToPath(self.default_redirect.clone())
                }
            }
            (Some(RouteClass::Protected), Some(_)) => Decision::Continue,
        }
    }
}
