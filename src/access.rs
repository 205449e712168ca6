use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::User;

// --- Page Identifiers ---

/// Page
///
/// Identifies a dashboard page. Known pages form a closed set; any other name is carried
/// verbatim in `Other` so that it can still be evaluated (and rejected) by the allow-lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Page {
    AdminVideoManagement,
    Applications,
    Apply,
    ChatterDashboard,
    Dashboard,
    Documents,
    Home,
    Landing,
    ModelDashboard,
    Models,
    MyDocuments,
    MyProfile,
    MyShifts,
    MyTraining,
    PrivacyPolicy,
    SelectRole,
    Settings,
    Shifts,
    TeamChat,
    TeamMindmap,
    TermsOfService,
    Training,
    TrainingCourse,
    Users,
    VIPDashboard,
    Welcome,
    Other(String),
}

/// Pages reachable without any session or role check.
pub const PUBLIC_PAGES: [Page; 6] = [
    Page::Apply,
    Page::Welcome,
    Page::SelectRole,
    Page::Landing,
    Page::PrivacyPolicy,
    Page::TermsOfService,
];

static KNOWN_PAGES: [Page; 26] = [
    Page::AdminVideoManagement,
    Page::Applications,
    Page::Apply,
    Page::ChatterDashboard,
    Page::Dashboard,
    Page::Documents,
    Page::Home,
    Page::Landing,
    Page::ModelDashboard,
    Page::Models,
    Page::MyDocuments,
    Page::MyProfile,
    Page::MyShifts,
    Page::MyTraining,
    Page::PrivacyPolicy,
    Page::SelectRole,
    Page::Settings,
    Page::Shifts,
    Page::TeamChat,
    Page::TeamMindmap,
    Page::TermsOfService,
    Page::Training,
    Page::TrainingCourse,
    Page::Users,
    Page::VIPDashboard,
    Page::Welcome,
];

impl Page {
    /// The page served when no page name is requested (`/`).
    pub const MAIN: Page = Page::Dashboard;

    /// parse
    ///
    /// Resolves a page name or URL path segment. Matching is ASCII case-insensitive because
    /// page URLs use the lower-cased name (`/modeldashboard`). A leading `/` is ignored and an
    /// empty name resolves to the main page.
    pub fn parse(name: &str) -> Page {
        let name = name.trim().trim_start_matches('/');
        if name.is_empty() {
            return Page::MAIN;
        }
        KNOWN_PAGES
            .iter()
            .find(|page| page.as_str().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| Page::Other(name.to_string()))
    }

    /// The known page an `Other` name spells, if any. `Other("apply")` and `Apply` must be
    /// gated identically no matter how the value was built.
    pub fn canonical(&self) -> Page {
        match self {
            Page::Other(name) => Page::parse(name),
            known => known.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Page::AdminVideoManagement => "AdminVideoManagement",
            Page::Applications => "Applications",
            Page::Apply => "Apply",
            Page::ChatterDashboard => "ChatterDashboard",
            Page::Dashboard => "Dashboard",
            Page::Documents => "Documents",
            Page::Home => "Home",
            Page::Landing => "Landing",
            Page::ModelDashboard => "ModelDashboard",
            Page::Models => "Models",
            Page::MyDocuments => "MyDocuments",
            Page::MyProfile => "MyProfile",
            Page::MyShifts => "MyShifts",
            Page::MyTraining => "MyTraining",
            Page::PrivacyPolicy => "PrivacyPolicy",
            Page::SelectRole => "SelectRole",
            Page::Settings => "Settings",
            Page::Shifts => "Shifts",
            Page::TeamChat => "TeamChat",
            Page::TeamMindmap => "TeamMindmap",
            Page::TermsOfService => "TermsOfService",
            Page::Training => "Training",
            Page::TrainingCourse => "TrainingCourse",
            Page::Users => "Users",
            Page::VIPDashboard => "VIPDashboard",
            Page::Welcome => "Welcome",
            Page::Other(name) => name,
        }
    }

    /// The relative URL the front-end shell navigates to for this page.
    pub fn location(&self) -> String {
        format!("/{}", self.as_str().to_ascii_lowercase())
    }

    pub fn is_public(&self) -> bool {
        PUBLIC_PAGES.contains(&self.canonical())
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Page {
    fn from(name: &str) -> Self {
        Page::parse(name)
    }
}

// --- Roles ---

/// EffectiveRole
///
/// The single role used for every access decision. It collapses the platform flag (`role`)
/// and the business flag (`user_role`) of a `User` into one value, with admin taking precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EffectiveRole {
    Admin,
    Chatter,
    Model,
    Vip,
    Unassigned,
}

const ADMIN_PAGES: &[Page] = &[
    Page::Dashboard,
    Page::Applications,
    Page::Users,
    Page::Shifts,
    Page::Models,
    Page::Training,
    Page::Documents,
    Page::AdminVideoManagement,
    Page::TeamMindmap,
    Page::Settings,
];

const CHATTER_PAGES: &[Page] = &[
    Page::ChatterDashboard,
    Page::MyShifts,
    Page::MyTraining,
    Page::TrainingCourse,
    Page::TeamMindmap,
    Page::Settings,
];

const MODEL_PAGES: &[Page] = &[
    Page::ModelDashboard,
    Page::MyProfile,
    Page::MyDocuments,
    Page::TeamChat,
    Page::TeamMindmap,
    Page::Settings,
];

const VIP_PAGES: &[Page] = &[Page::VIPDashboard, Page::TeamMindmap, Page::Settings];

const NO_PAGES: &[Page] = &[];

impl EffectiveRole {
    /// resolve
    ///
    /// Admin if the platform flag is `admin`, otherwise the business role when it is one of
    /// `model`, `chatter` or `vip`, otherwise `Unassigned`. Unrecognized values (the hosted
    /// backend reports plain members as `role = "user"`) count as absent.
    pub fn resolve(role: Option<&str>, user_role: Option<&str>) -> EffectiveRole {
        if role == Some("admin") {
            return EffectiveRole::Admin;
        }
        match user_role {
            Some("model") => EffectiveRole::Model,
            Some("chatter") => EffectiveRole::Chatter,
            Some("vip") => EffectiveRole::Vip,
            _ => EffectiveRole::Unassigned,
        }
    }

    pub fn of(user: &User) -> EffectiveRole {
        EffectiveRole::resolve(user.role.as_deref(), user.user_role.as_deref())
    }

    /// The page a user of this role is sent to when a requested page is off-limits.
    pub fn home(self) -> Page {
        match self {
            EffectiveRole::Admin => Page::Dashboard,
            EffectiveRole::Chatter => Page::ChatterDashboard,
            EffectiveRole::Model => Page::ModelDashboard,
            EffectiveRole::Vip => Page::VIPDashboard,
            EffectiveRole::Unassigned => Page::SelectRole,
        }
    }

    /// allowed_pages
    ///
    /// The static allow-list for this role. `Unassigned` has none; public pages are
    /// handled before the allow-list is ever consulted.
    pub fn allowed_pages(self) -> &'static [Page] {
        match self {
            EffectiveRole::Admin => ADMIN_PAGES,
            EffectiveRole::Chatter => CHATTER_PAGES,
            EffectiveRole::Model => MODEL_PAGES,
            EffectiveRole::Vip => VIP_PAGES,
            EffectiveRole::Unassigned => NO_PAGES,
        }
    }

    pub fn allows(self, page: &Page) -> bool {
        self.allowed_pages().contains(&page.canonical())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveRole::Admin => "admin",
            EffectiveRole::Chatter => "chatter",
            EffectiveRole::Model => "model",
            EffectiveRole::Vip => "vip",
            EffectiveRole::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Decision Types ---

/// Session
///
/// The session state the router evaluates against. `Loading` is the initial state while the
/// session fetch is in flight; `Failed` covers both "no session" and any fetch failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Loading,
    Failed,
    Active(User),
}

/// Why a request was redirected. None of these are ever shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenial {
    #[error("no valid session")]
    NoSession,
    #[error("user has no role assigned")]
    RoleUnassigned,
    #[error("page {page} is not allowed for role {role}")]
    RoleForbiddenForPage { role: EffectiveRole, page: Page },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// The external login flow, returning to the requested page afterwards.
    Login { return_to: Page },
    Page(Page),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render(Page),
    Redirect {
        target: RedirectTarget,
        reason: AccessDenial,
    },
    /// The session is still being resolved; show a loading indicator, never content.
    Loading,
}

impl AccessDenial {
    /// Stable identifier for logs and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AccessDenial::NoSession => "no_session",
            AccessDenial::RoleUnassigned => "role_unassigned",
            AccessDenial::RoleForbiddenForPage { .. } => "role_forbidden_for_page",
        }
    }

    /// The redirect each denial maps to, deterministically.
    pub fn target(&self, requested: &Page) -> RedirectTarget {
        match self {
            AccessDenial::NoSession => RedirectTarget::Login {
                return_to: requested.clone(),
            },
            AccessDenial::RoleUnassigned => RedirectTarget::Page(Page::SelectRole),
            AccessDenial::RoleForbiddenForPage { role, .. } => RedirectTarget::Page(role.home()),
        }
    }

    fn into_decision(self, requested: &Page) -> Decision {
        Decision::Redirect {
            target: self.target(requested),
            reason: self,
        }
    }
}

impl Decision {
    pub fn denial(&self) -> Option<&AccessDenial> {
        match self {
            Decision::Redirect { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn renders_content(&self) -> bool {
        matches!(self, Decision::Render(_))
    }
}

/// decide
///
/// Evaluates the page gate in strict order; the first matching check wins:
/// 1. public pages render regardless of the session,
/// 2. a failed session redirects to login,
/// 3. a loading session shows a loading indicator and an unassigned user goes to SelectRole,
/// 4. a page outside the role's allow-list redirects to the role's home page,
/// 5. otherwise the page renders.
pub fn decide(session: &Session, page: &Page) -> Decision {
    let page = &page.canonical();

    if page.is_public() {
        return Decision::Render(page.clone());
    }

    let user = match session {
        Session::Failed => return AccessDenial::NoSession.into_decision(page),
        Session::Loading => return Decision::Loading,
        Session::Active(user) => user,
    };

    let role = EffectiveRole::of(user);
    if role == EffectiveRole::Unassigned {
        return AccessDenial::RoleUnassigned.into_decision(page);
    }

    if !role.allows(page) {
        return AccessDenial::RoleForbiddenForPage {
            role,
            page: page.clone(),
        }
        .into_decision(page);
    }

    Decision::Render(page.clone())
}
