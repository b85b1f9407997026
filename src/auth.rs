use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AuthError},
    gate::{Identity, Role},
};

/// Name of the cookie the identity provider stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Local-only bypass header. It carries a user id only; roles come from signed sessions.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. The role lives under the public metadata claim; tokens
/// issued before a role was assigned simply omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity provider's user id.
    pub sub: String,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn into_identity(self) -> Identity {
        let role = self
            .metadata
            .and_then(|metadata| metadata.role)
            .map(|raw| Role::from_claim(&raw));
        Identity::new(self.sub, role)
    }
}

/// IdentityProvider
///
/// Resolves the caller behind a request. `Ok(None)` means "signed out"; `Err` is reserved
/// for a provider that cannot answer at all (an unreachable remote session service, say),
/// which the gate surfaces instead of guessing. Token verification alone never fails.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AuthError>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

/// ResolvedIdentity
///
/// Request extension written by the gate middleware so extractors further down do not
/// resolve the session a second time.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity(pub Option<Identity>);

/// JwtIdentityProvider
///
/// Verifies HS256 session tokens from the `Authorization: Bearer` header or the session
/// cookie. In `Env::Local` an `x-user-id` header is accepted first, as a signed-in caller
/// without a role.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    env: Env,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            env: config.env.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    fn local_bypass(headers: &HeaderMap) -> Option<Identity> {
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Identity::new(id, None))
    }

    fn verify(&self, token: &str) -> Option<Identity> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims.into_identity()),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                tracing::debug!("session token expired");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "rejecting session token");
                None
            }
        }
    }
}

/// session_token
///
/// Extracts the raw token, preferring the bearer header over the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value)
    })
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AuthError> {
        if self.env == Env::Local {
            if let Some(identity) = Self::local_bypass(&parts.headers) {
                return Ok(Some(identity));
            }
        }

        Ok(session_token(&parts.headers).and_then(|token| self.verify(token)))
    }
}

/// AuthUser
///
/// Extractor for handlers that need a signed-in caller. Reuses the identity the gate
/// middleware already resolved; falls back to the provider when the handler is mounted
/// without the gate. Rejects with `401` when nobody is signed in.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<ResolvedIdentity>() {
            Some(ResolvedIdentity(identity)) => identity.clone(),
            None => IdentityState::from_ref(state).resolve(parts).await?,
        };

        let identity = identity.ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            role: identity.effective_role(),
            id: identity.user_id,
        })
    }
}
