use crate::{
    AppState,
    access::{Decision, EffectiveRole, Page, RedirectTarget, Session, decide},
    auth::{SessionUser, resolve_session},
    error::{ApiError, SessionError},
    models::{
        AccessDecision, BusinessRole, DecisionOutcome, LoginQuery, NavItemResponse,
        RoleSelectionRequest, RoleSelectionResponse, UserProfile,
    },
    navigation::{SelfAssignableRole, after_role_selected, nav_items, role_selection_redirect},
    session::SessionProvider,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
};

/// access_decision
///
/// Converts a gate decision into its wire form. Login redirects resolve to the provider's
/// absolute login URL; page redirects to the target page's relative location.
pub fn access_decision(
    decision: &Decision,
    page: &Page,
    provider: &dyn SessionProvider,
) -> AccessDecision {
    match decision {
        Decision::Render(rendered) => AccessDecision {
            outcome: DecisionOutcome::Render,
            page: rendered.to_string(),
            location: None,
            reason: None,
        },
        Decision::Loading => AccessDecision {
            outcome: DecisionOutcome::Loading,
            page: page.to_string(),
            location: None,
            reason: None,
        },
        Decision::Redirect { target, reason } => {
            let location = match target {
                RedirectTarget::Login { return_to } => provider.login_url(Some(return_to)),
                RedirectTarget::Page(target) => target.location(),
            };
            AccessDecision {
                outcome: DecisionOutcome::Redirect,
                page: page.to_string(),
                location: Some(location),
                reason: Some(reason.code().to_string()),
            }
        }
    }
}

// --- Handlers ---

/// get_access
///
/// [Public Route] Evaluates the access gate for one page on behalf of the front-end shell.
///
/// Public pages are decided without touching the session backend, so they stay reachable even
/// while the backend is down. Every other page resolves the caller's session first.
#[utoipa::path(
    get,
    path = "/access/{page}",
    params(("page" = String, Path, description = "Page name or lower-cased URL segment")),
    responses((status = 200, description = "Gate decision", body = AccessDecision))
)]
pub async fn get_access(
    State(state): State<AppState>,
    Path(page): Path<String>,
    headers: HeaderMap,
) -> Json<AccessDecision> {
    let page = Page::parse(&page);
    tracing::Span::current().record("page", page.as_str());

    let session = if page.is_public() {
        // Never consulted: the public bypass short-circuits before the session is read.
        Session::Loading
    } else {
        resolve_session(&headers, &state.config, &state.session).await
    };

    let decision = decide(&session, &page);
    if let Some(denial) = decision.denial() {
        tracing::info!(page = %page, reason = denial.code(), "access redirected: {}", denial);
    }

    Json(access_decision(
        &decision,
        &page,
        state.session.provider().as_ref(),
    ))
}

/// get_login
///
/// [Public Route] Sends the browser to the external login flow, returning to `return_to`.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 303, description = "Redirect to the login flow"))
)]
pub async fn get_login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Redirect {
    let return_to = query.return_to.as_deref().map(Page::parse);
    Redirect::to(&state.session.provider().login_url(return_to.as_ref()))
}

/// get_me
///
/// [Authenticated Route] The caller's profile with the effective role and its home page.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(SessionUser { user, .. }: SessionUser) -> Json<UserProfile> {
    let role = EffectiveRole::of(&user);
    Json(UserProfile {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        avatar_url: user.avatar_url,
        effective_role: role,
        home: role.home().location(),
    })
}

/// get_navigation
///
/// [Authenticated Route] Sidebar entries for the caller's role. Empty for unassigned users.
#[utoipa::path(
    get,
    path = "/me/navigation",
    responses(
        (status = 200, description = "Navigation", body = [NavItemResponse]),
        (status = 401, description = "No session")
    )
)]
pub async fn get_navigation(SessionUser { user, .. }: SessionUser) -> Json<Vec<NavItemResponse>> {
    let items = nav_items(EffectiveRole::of(&user))
        .iter()
        .map(|item| item.to_response())
        .collect();
    Json(items)
}

/// select_role
///
/// [Authenticated Route] The SelectRole step: an unassigned user picks `model` or `chatter`.
///
/// *Rules*: users who already have an effective role get 409; roles that cannot be
/// self-assigned get 400. The write goes to the session backend; the access gate sees the new
/// role on its next session fetch.
#[utoipa::path(
    put,
    path = "/me/role",
    request_body = RoleSelectionRequest,
    responses(
        (status = 200, description = "Role assigned", body = RoleSelectionResponse),
        (status = 400, description = "Role cannot be self-assigned"),
        (status = 401, description = "No session"),
        (status = 409, description = "Role already assigned"),
        (status = 502, description = "Backend rejected the update")
    )
)]
pub async fn select_role(
    SessionUser { user, token }: SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<RoleSelectionRequest>,
) -> Result<Json<RoleSelectionResponse>, ApiError> {
    if role_selection_redirect(&user).is_some() {
        return Err(ApiError::RoleAlreadyAssigned(
            EffectiveRole::of(&user).to_string(),
        ));
    }

    let role = BusinessRole::parse(&payload.user_role)
        .and_then(|role| SelfAssignableRole::try_from(role).ok())
        .ok_or_else(|| ApiError::RoleNotSelectable(payload.user_role.clone()))?;

    let token = token.ok_or(SessionError::NoSession)?;
    let updated = state
        .session
        .provider()
        .update_role(&token, role.into())
        .await?;

    let page = after_role_selected(role);
    tracing::info!(user_id = %updated.id, role = %payload.user_role, "role selected");

    Ok(Json(RoleSelectionResponse {
        effective_role: EffectiveRole::of(&updated),
        location: page.location(),
        page: page.to_string(),
    }))
}

/// logout
///
/// [Authenticated Route] Ends the caller's session at the backend.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "No session")
    )
)]
pub async fn logout(
    SessionUser { token, .. }: SessionUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    // Dev-bypass sessions carry no token and have nothing to end.
    if let Some(token) = token {
        state.session.provider().logout(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
