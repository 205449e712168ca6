use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable by any client. The access gate itself is public: it is the thing that
/// decides whether the caller may see a page, so it must answer callers without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers. Does not touch the session backend.
        .route("/health", get(|| async { "ok" }))
        // GET /access/{page}
        // Render / redirect / loading decision for one page and the caller's session.
        .route("/access/{page}", get(handlers::get_access))
        // GET /login?return_to=...
        // 303 to the external login flow.
        .route("/login", get(handlers::get_login))
}
