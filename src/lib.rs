use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span, field};

const REQUEST_ID_HEADER: &str = "x-request-id";

// --- Module Structure ---

// Access policy: the page gate and its decision types.
pub mod access;
// Session backend contract, clients, and timeout/retry resolution.
pub mod session;
// Client-side navigation sequencing (last navigation wins).
pub mod navigator;
// Role menus and the role self-selection rules.
pub mod navigation;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

use auth::SessionUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use access::{Decision, EffectiveRole, Page, RedirectTarget, Session, decide};
pub use config::AppConfig;
pub use navigator::{Navigation, Navigator};
pub use session::{
    HostedSessionProvider, MockSessionProvider, SessionContext, SessionProvider,
    SessionProviderState,
};

/// ApiDoc
///
/// OpenAPI document for the gateway, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_access, handlers::get_login, handlers::get_me,
        handlers::get_navigation, handlers::select_role, handlers::logout
    ),
    components(
        schemas(
            models::AccessDecision, models::DecisionOutcome, models::UserProfile,
            models::NavItemResponse, models::RoleSelectionRequest, models::RoleSelectionResponse,
            models::BusinessRole, models::User, access::EffectiveRole,
        )
    ),
    tags(
        (name = "agency-portal", description = "Agency dashboard access gateway")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the session backend (wrapped in
/// its timeout/retry policy) and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionContext,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionContext {
    fn from_ref(app_state: &AppState) -> SessionContext {
        app_state.session.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_middleware
///
/// Guards `authenticated_routes`. Resolving `SessionUser` rejects the request with 401 when no
/// session can be established; on success the user is stored in the request extensions so the
/// handler's own `SessionUser` extractor does not hit the backend a second time.
async fn session_middleware(session_user: SessionUser, mut request: Request, next: Next) -> Response {
    Span::current().record("role", EffectiveRole::of(&session_user.user).as_str());
    request.extensions_mut().insert(session_user);
    next.run(request).await
}

/// create_router
///
/// Public routes answer anyone; the authenticated routes sit behind `session_middleware`.
/// Every request gets an `x-request-id` (generated if absent, echoed back) and a `gateway` span.
pub fn create_router(state: AppState) -> Router {
    let guarded = authenticated::authenticated_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), session_middleware),
    );

    let routes = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(guarded)
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(gateway_span).on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
        )
        .layer(PropagateRequestIdLayer::new(request_id));

    // The front end is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes.layer(observability).layer(cors)
}

/// gateway_span
///
/// One span per request, keyed by `x-request-id`. `page` is filled in by the access gate and
/// `role` by the session guard, so every log line of a request says who asked for what.
fn gateway_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let req_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "gateway",
        %req_id,
        method = %request.method(),
        path = request.uri().path(),
        page = field::Empty,
        role = field::Empty,
    )
}
