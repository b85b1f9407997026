use std::{env, time::Duration};

/// AppConfig
///
/// Holds the service configuration. Loaded once at start-up and shared read-only through
/// `AppState`; handlers and extractors pull it out via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local identity bypass and log format.
    pub env: Env,
    // HS256 secret used to verify session tokens issued by the identity provider.
    pub jwt_secret: String,
    // Where anonymous callers are sent when they hit a protected page.
    pub sign_in_url: String,
    // Where authenticated non-teachers are sent from teacher-only pages.
    pub default_redirect: String,
    // Artificial processing time for the mock analysis endpoint.
    pub analysis_delay: Duration,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Switches between development conveniences (header bypass, pretty logs) and the hardened
/// production setup (token-only auth, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_SIGN_IN_URL: &str = "/sign-in";
const DEFAULT_ANALYSIS_DELAY_MS: u64 = 1500;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Non-panicking configuration for tests. No artificial analysis delay.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            sign_in_url: DEFAULT_SIGN_IN_URL.to_string(),
            default_redirect: crate::gate::DEFAULT_REDIRECT.to_string(),
            analysis_delay: Duration::ZERO,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `SESSION_JWT_SECRET` is missing, so the service never starts
    /// with a guessable token secret.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .expect("FATAL: SESSION_JWT_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        let analysis_delay_ms = match env::var("ANALYSIS_DELAY_MS") {
            Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ANALYSIS_DELAY_MS is not a number, using default");
                DEFAULT_ANALYSIS_DELAY_MS
            }),
            Err(_) => DEFAULT_ANALYSIS_DELAY_MS,
        };

        Self {
            env,
            jwt_secret,
            sign_in_url: env::var("SIGN_IN_URL")
                .unwrap_or_else(|_| DEFAULT_SIGN_IN_URL.to_string()),
            default_redirect: crate::gate::DEFAULT_REDIRECT.to_string(),
            analysis_delay: Duration::from_millis(analysis_delay_ms),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}
