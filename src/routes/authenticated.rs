use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for callers with a resolved session. Every handler takes the `SessionUser`
/// extractor, and the router is additionally wrapped in the session middleware in `lib.rs`,
/// so an unauthenticated request is rejected with 401 before reaching a handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Profile, effective role and home page of the caller.
        .route("/me", get(handlers::get_me))
        // GET /me/navigation
        // Sidebar entries for the caller's role.
        .route("/me/navigation", get(handlers::get_navigation))
        // PUT /me/role
        // Role self-selection (model or chatter) for unassigned users.
        .route("/me/role", put(handlers::select_role))
        // POST /logout
        // Ends the session at the backend.
        .route("/logout", post(handlers::logout))
}
