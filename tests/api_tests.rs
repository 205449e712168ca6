use agency_portal::{
    AppConfig, AppState, HostedSessionProvider, SessionContext, SessionProvider, create_router,
    error::SessionError,
    models::{AccessDecision, BusinessRole, DecisionOutcome, NavItemResponse, User, UserProfile},
    session::SessionProviderState,
};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    routing::{get, post},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::Mutex};
use tower::ServiceExt;

// --- Fake hosted backend ---

type Users = Arc<Mutex<HashMap<String, User>>>;

const APP_ID: &str = "app-test";

fn token_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn fake_me(State(users): State<Users>, headers: HeaderMap) -> Result<Json<User>, StatusCode> {
    let token = token_of(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if token == "broken" {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    users
        .lock()
        .await
        .get(&token)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn fake_update_me(
    State(users): State<Users>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<User>, StatusCode> {
    let token = token_of(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut users = users.lock().await;
    let user = users.get_mut(&token).ok_or(StatusCode::UNAUTHORIZED)?;
    user.user_role = body["user_role"].as_str().map(str::to_string);
    Ok(Json(user.clone()))
}

async fn fake_logout(State(users): State<Users>, headers: HeaderMap) -> StatusCode {
    let Some(token) = token_of(&headers) else {
        return StatusCode::UNAUTHORIZED;
    };
    match users.lock().await.remove(&token) {
        Some(_) => StatusCode::OK,
        None => StatusCode::UNAUTHORIZED,
    }
}

fn member(id: &str, role: &str, user_role: Option<&str>) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role: Some(role.to_string()),
        user_role: user_role.map(str::to_string),
        ..User::default()
    }
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

async fn spawn_backend() -> String {
    let users: Users = Arc::new(Mutex::new(HashMap::from([
        ("admin-token".to_string(), member("a1", "admin", None)),
        ("chatter-token".to_string(), member("c1", "user", Some("chatter"))),
        ("new-token".to_string(), member("n1", "user", None)),
    ])));

    let me = format!("/api/apps/{}/entities/User/me", APP_ID);
    let logout = format!("/api/apps/{}/auth/logout", APP_ID);
    let router = Router::new()
        .route(&me, get(fake_me).put(fake_update_me))
        .route(&logout, post(fake_logout))
        .with_state(users);

    spawn(router).await
}

// --- Gateway under test ---

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub backend: String,
}

async fn spawn_app() -> TestApp {
    let backend = spawn_backend().await;

    let mut config = AppConfig::default();
    config.baas_url = backend.clone();
    config.baas_app_id = APP_ID.to_string();
    config.app_url = "https://portal.example.com".to_string();
    config.session_timeout = Duration::from_secs(2);

    let provider = Arc::new(HostedSessionProvider::from_config(&config)) as SessionProviderState;
    let state = AppState {
        session: SessionContext::from_config(provider, &config),
        config,
    };

    let address = spawn(create_router(state)).await;
    TestApp { address, backend }
}

async fn access(app: &TestApp, page: &str, token: Option<&str>) -> AccessDecision {
    let mut request = reqwest::Client::new().get(format!("{}/access/{}", app.address, page));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("req fail");
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_access_gate_end_to_end() {
    let app = spawn_app().await;

    let decision = access(&app, "users", Some("admin-token")).await;
    assert_eq!(decision.outcome, DecisionOutcome::Render);
    assert_eq!(decision.page, "Users");

    let decision = access(&app, "modeldashboard", Some("chatter-token")).await;
    assert_eq!(decision.outcome, DecisionOutcome::Redirect);
    assert_eq!(decision.location.as_deref(), Some("/chatterdashboard"));

    let decision = access(&app, "teammindmap", Some("new-token")).await;
    assert_eq!(decision.location.as_deref(), Some("/selectrole"));

    let decision = access(&app, "settings", None).await;
    assert_eq!(decision.reason.as_deref(), Some("no_session"));
    let location = decision.location.unwrap();
    assert!(location.starts_with(&format!("{}/login?from_url=", app.backend)));

    let decision = access(&app, "welcome", None).await;
    assert_eq!(decision.outcome, DecisionOutcome::Render);
}

#[tokio::test]
async fn test_backend_errors_degrade_to_login() {
    let app = spawn_app().await;

    let decision = access(&app, "dashboard", Some("broken")).await;

    assert_eq!(decision.outcome, DecisionOutcome::Redirect);
    assert_eq!(decision.reason.as_deref(), Some("no_session"));
}

#[tokio::test]
async fn test_login_redirect() {
    let app = spawn_app().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client
        .get(format!("{}/login?return_to=MyShifts", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 303);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with(&format!("{}/login", app.backend)));
    assert!(location.contains("myshifts"));
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/me", app.address)).await.unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_role_selection_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let navigation: Vec<NavItemResponse> = client
        .get(format!("{}/me/navigation", app.address))
        .bearer_auth("new-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(navigation.is_empty());

    // Roles outside the self-assignable set are a bad request, not a body parse failure.
    let response = client
        .put(format!("{}/me/role", app.address))
        .bearer_auth("new-token")
        .json(&serde_json::json!({ "user_role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .put(format!("{}/me/role", app.address))
        .bearer_auth("new-token")
        .json(&serde_json::json!({ "user_role": "model" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The gate observes the new role on the next session fetch.
    let profile: UserProfile = client
        .get(format!("{}/me", app.address))
        .bearer_auth("new-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile.home, "/modeldashboard");

    let decision = access(&app, "mydocuments", Some("new-token")).await;
    assert_eq!(decision.outcome, DecisionOutcome::Render);

    // A second selection is refused.
    let response = client
        .put(format!("{}/me/role", app.address))
        .bearer_auth("new-token")
        .json(&serde_json::json!({ "user_role": "chatter" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/logout", app.address))
        .bearer_auth("chatter-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let decision = access(&app, "myshifts", Some("chatter-token")).await;
    assert_eq!(decision.reason.as_deref(), Some("no_session"));
}

#[tokio::test]
async fn test_hosted_provider_classifies_statuses() {
    let backend = spawn_backend().await;
    let provider = HostedSessionProvider::new(&backend, APP_ID, "https://portal.example.com");

    let admin = provider.current_user("admin-token").await.unwrap();
    assert_eq!(admin.id, "a1");

    assert_eq!(
        provider.current_user("nobody").await.unwrap_err(),
        SessionError::NoSession
    );
    assert!(matches!(
        provider.current_user("broken").await.unwrap_err(),
        SessionError::Transient(_)
    ));

    let updated = provider
        .update_role("new-token", BusinessRole::Chatter)
        .await
        .unwrap();
    assert_eq!(updated.user_role.as_deref(), Some("chatter"));
}

#[tokio::test]
async fn test_hosted_provider_unreachable_is_transient() {
    // Nothing listens on the discard port.
    let provider = HostedSessionProvider::new("http://127.0.0.1:9", APP_ID, "https://portal.example.com");

    let err = provider.current_user("admin-token").await.unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_openapi_document_lists_gateway_routes() {
    let provider = Arc::new(HostedSessionProvider::new(
        "http://127.0.0.1:9",
        APP_ID,
        "https://portal.example.com",
    )) as SessionProviderState;
    let config = AppConfig::default();
    let router = create_router(AppState {
        session: SessionContext::from_config(provider, &config),
        config,
    });

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(doc["paths"]["/access/{page}"].is_object());
    assert!(doc["paths"]["/me/role"]["put"].is_object());
}
