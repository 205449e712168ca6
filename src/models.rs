use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::access::EffectiveRole;

// --- Session Provider Schemas ---

/// User
///
/// The authenticated member record as returned by the hosted backend's `User/me` endpoint.
/// It is owned by the backend and read-only here; unknown fields are ignored.
///
/// `role` and `user_role` are kept as the raw strings the backend sends. They are only ever
/// interpreted through `EffectiveRole::of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    // Platform privilege flag: "admin" or "user".
    #[serde(default)]
    pub role: Option<String>,
    // Business role: "model", "chatter" or "vip".
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub created_date: Option<DateTime<Utc>>,
}

/// BusinessRole
///
/// The business-facing role values that can be written to a user's `user_role` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BusinessRole {
    Model,
    Chatter,
    Vip,
}

impl BusinessRole {
    /// Reads a role value as the backend stores it. Anything else is not a business role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "model" => Some(BusinessRole::Model),
            "chatter" => Some(BusinessRole::Chatter),
            "vip" => Some(BusinessRole::Vip),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusinessRole::Model => "model",
            BusinessRole::Chatter => "chatter",
            BusinessRole::Vip => "vip",
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RoleSelectionRequest
///
/// Input payload for the role self-selection step (PUT /me/role).
///
/// `user_role` stays a plain string so that any value outside `model`/`chatter` is refused
/// by the handler with 400 rather than by the JSON extractor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleSelectionRequest {
    #[schema(example = "model")]
    pub user_role: String,
}

/// LoginQuery
///
/// Query parameters for GET /login.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct LoginQuery {
    /// Page the login flow should return to.
    pub return_to: Option<String>,
}

// --- Output Schemas ---

/// DecisionOutcome
///
/// What the front-end shell must do with the requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DecisionOutcome {
    Render,
    Redirect,
    Loading,
}

/// AccessDecision
///
/// Output schema for GET /access/{page}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessDecision {
    pub outcome: DecisionOutcome,
    /// The page that was evaluated, normalized to its canonical name.
    pub page: String,
    /// Where to navigate to. Set only for redirects; login redirects carry an absolute URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Machine-readable redirect reason, for logs and diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// UserProfile
///
/// Output schema for GET /me.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub effective_role: EffectiveRole,
    /// Location of the role's home page.
    pub home: String,
}

/// NavItemResponse
///
/// One sidebar entry for GET /me/navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavItemResponse {
    pub label: String,
    pub page: String,
    pub location: String,
}

/// RoleSelectionResponse
///
/// Output of PUT /me/role: the updated role and the page to continue on.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleSelectionResponse {
    pub effective_role: EffectiveRole,
    pub page: String,
    pub location: String,
}
