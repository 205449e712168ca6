use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    access::Session,
    config::AppConfig,
    models::User,
    session::SessionContext,
};

/// Header that impersonates a role when `AppConfig::dev_bypass` is on. Ignored otherwise.
pub const DEV_ROLE_HEADER: &str = "x-dev-role";

/// Claims
///
/// The subset of the session token payload checked locally when `SESSION_JWT_SECRET` is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the backend's user id.
    pub sub: String,
    /// Expiration Time (exp). An expired token never reaches the backend.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Extracts the bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// validate_token
///
/// Verifies signature and expiry of a session token against the configured secret.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ErrorKind> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // The backend sets its own audience; only signature and expiry matter here.
    validation.validate_aud = false;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| e.into_kind())
}

/// Builds the impersonated user for the local development bypass.
fn dev_user(role: &str) -> User {
    let role = role.trim().to_ascii_lowercase();
    let (platform, business) = match role.as_str() {
        "admin" => (Some("admin"), None),
        "model" | "chatter" | "vip" => (Some("user"), Some(role.as_str())),
        _ => (Some("user"), None),
    };
    User {
        id: format!("dev-{}", role),
        email: format!("dev-{}@localhost", role),
        full_name: Some(format!("Dev {}", role)),
        role: platform.map(str::to_string),
        user_role: business.map(str::to_string),
        ..User::default()
    }
}

/// resolve_session
///
/// Turns request headers into the session state the access gate evaluates:
/// 1. Local bypass: with an explicit `APP_ENV=local`, the `x-dev-role` header impersonates a role.
/// 2. Token extraction: `Authorization: Bearer <token>`; a missing token is a failed session.
/// 3. Local validation: with a configured secret, a bad or expired token fails without a
///    backend round trip.
/// 4. Backend lookup through the `SessionContext` (timeout and retries included).
pub async fn resolve_session(
    headers: &HeaderMap,
    config: &AppConfig,
    session: &SessionContext,
) -> Session {
    if config.dev_bypass {
        if let Some(role) = headers.get(DEV_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            tracing::debug!(role, "local dev role bypass");
            return Session::Active(dev_user(role));
        }
    }

    let token = bearer_token(headers);

    if let (Some(secret), Some(token)) = (config.jwt_secret.as_deref(), token.as_deref()) {
        if let Err(kind) = validate_token(token, secret) {
            match kind {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                other => tracing::debug!(error = ?other, "session token invalid"),
            }
            return Session::Failed;
        }
    }

    session.resolve(token.as_deref()).await
}

/// SessionUser
///
/// The resolved identity of an authenticated request, with the token it was resolved from
/// (needed to act on the user's behalf against the backend).
///
/// Rejection: `StatusCode::UNAUTHORIZED` when the session cannot be resolved.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub token: Option<String>,
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionContext: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the session middleware for this request.
        if let Some(resolved) = parts.extensions.get::<SessionUser>() {
            return Ok(resolved.clone());
        }

        let session = SessionContext::from_ref(state);
        let config = AppConfig::from_ref(state);

        match resolve_session(&parts.headers, &config, &session).await {
            Session::Active(user) => Ok(SessionUser {
                user,
                token: bearer_token(&parts.headers),
            }),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
