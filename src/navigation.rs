use crate::{
    access::{EffectiveRole, Page},
    models::{BusinessRole, NavItemResponse, User},
};

/// NavItem
///
/// One entry of the role-specific sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct NavItem {
    pub label: &'static str,
    pub page: Page,
}

impl NavItem {
    const fn new(label: &'static str, page: Page) -> Self {
        Self { label, page }
    }

    pub fn to_response(&self) -> NavItemResponse {
        NavItemResponse {
            label: self.label.to_string(),
            page: self.page.to_string(),
            location: self.page.location(),
        }
    }
}

const ADMIN_NAV: &[NavItem] = &[
    NavItem::new("Dashboard", Page::Dashboard),
    NavItem::new("Bewerbungen", Page::Applications),
    NavItem::new("Nutzer", Page::Users),
    NavItem::new("Schichtplan", Page::Shifts),
    NavItem::new("Models", Page::Models),
    NavItem::new("Schulungen", Page::Training),
    NavItem::new("Dokumente", Page::Documents),
    NavItem::new("VIP Videos", Page::AdminVideoManagement),
    NavItem::new("Team Hierarchie", Page::TeamMindmap),
];

const CHATTER_NAV: &[NavItem] = &[
    NavItem::new("Übersicht", Page::ChatterDashboard),
    NavItem::new("Meine Schichten", Page::MyShifts),
    NavItem::new("Schulungen", Page::MyTraining),
    NavItem::new("Team Hierarchie", Page::TeamMindmap),
];

const MODEL_NAV: &[NavItem] = &[
    NavItem::new("Übersicht", Page::ModelDashboard),
    NavItem::new("Mein Profil", Page::MyProfile),
    NavItem::new("Dokumente", Page::MyDocuments),
    NavItem::new("Team Chat", Page::TeamChat),
    NavItem::new("Team Hierarchie", Page::TeamMindmap),
];

const VIP_NAV: &[NavItem] = &[
    NavItem::new("Videos", Page::VIPDashboard),
    NavItem::new("Team Hierarchie", Page::TeamMindmap),
];

const NO_NAV: &[NavItem] = &[];

/// Sidebar entries for a role. Settings is reached through the account menu, not the sidebar.
pub fn nav_items(role: EffectiveRole) -> &'static [NavItem] {
    match role {
        EffectiveRole::Admin => ADMIN_NAV,
        EffectiveRole::Chatter => CHATTER_NAV,
        EffectiveRole::Model => MODEL_NAV,
        EffectiveRole::Vip => VIP_NAV,
        EffectiveRole::Unassigned => NO_NAV,
    }
}

// --- Role Selection ---

/// SelfAssignableRole
///
/// The roles a new member may pick on SelectRole. VIP and admin are granted by staff only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfAssignableRole {
    Model,
    Chatter,
}

impl TryFrom<BusinessRole> for SelfAssignableRole {
    type Error = BusinessRole;

    fn try_from(role: BusinessRole) -> Result<Self, Self::Error> {
        match role {
            BusinessRole::Model => Ok(SelfAssignableRole::Model),
            BusinessRole::Chatter => Ok(SelfAssignableRole::Chatter),
            other => Err(other),
        }
    }
}

impl From<SelfAssignableRole> for BusinessRole {
    fn from(role: SelfAssignableRole) -> Self {
        match role {
            SelfAssignableRole::Model => BusinessRole::Model,
            SelfAssignableRole::Chatter => BusinessRole::Chatter,
        }
    }
}

/// role_selection_redirect
///
/// Where a user who opens SelectRole should go instead. Anyone who already has an effective
/// role is sent home; `None` keeps an unassigned user on the page.
pub fn role_selection_redirect(user: &User) -> Option<Page> {
    match EffectiveRole::of(user) {
        EffectiveRole::Unassigned => None,
        role => Some(role.home()),
    }
}

/// The page a user continues on once a role has been picked.
pub fn after_role_selected(role: SelfAssignableRole) -> Page {
    match role {
        SelfAssignableRole::Model => Page::ModelDashboard,
        SelfAssignableRole::Chatter => Page::ChatterDashboard,
    }
}
