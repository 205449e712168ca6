use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// SessionError
///
/// Failures reported by a `SessionProvider`. Only `Transient` and `Timeout` are worth retrying;
/// `NoSession` means the backend positively rejected the token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no valid session")]
    NoSession,
    #[error("session backend unavailable: {0}")]
    Transient(String),
    #[error("session backend timed out")]
    Timeout,
    #[error("session backend rejected the request: {0}")]
    Rejected(String),
}

impl SessionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transient(_) | SessionError::Timeout)
    }
}

/// ApiError
///
/// Errors surfaced by the role-selection endpoint. Plain `StatusCode` rejections cover the
/// other handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("role {0} cannot be self-assigned")]
    RoleNotSelectable(String),
    #[error("user already has role {0}")]
    RoleAlreadyAssigned(String),
    #[error("session backend error: {0}")]
    Upstream(#[from] SessionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::RoleNotSelectable(_) => StatusCode::BAD_REQUEST,
            ApiError::RoleAlreadyAssigned(_) => StatusCode::CONFLICT,
            ApiError::Upstream(SessionError::NoSession) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
