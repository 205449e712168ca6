use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::{
    access::{Decision, Page, Session, decide},
    models::User,
    session::SessionContext,
};

/// Navigation
///
/// Result of one `Navigator::navigate` call. `Superseded` means a newer navigation started
/// before this one resolved, so its decision was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Applied(Decision),
    Superseded,
}

#[derive(Default)]
struct NavigatorState {
    current: Option<Decision>,
    cached_user: Option<User>,
    // Bumped by `invalidate`; a fetch started under an older generation may not refill the cache.
    generation: u64,
}

/// Navigator
///
/// Drives the access gate for one front-end session. Each navigation takes a ticket; only the
/// holder of the newest ticket may commit a decision, so a slow fetch started for an earlier
/// page can never redirect after a later page has been decided.
///
/// The resolved user is cached for the session. `invalidate` drops it so that the next
/// navigation observes changes made elsewhere (e.g. a role picked on SelectRole).
pub struct Navigator {
    session: SessionContext,
    token: Option<String>,
    issued: AtomicU64,
    state: Mutex<NavigatorState>,
}

impl Navigator {
    pub fn new(session: SessionContext, token: Option<String>) -> Self {
        Self {
            session,
            token,
            issued: AtomicU64::new(0),
            state: Mutex::new(NavigatorState::default()),
        }
    }

    /// The last committed decision, if any navigation has committed yet.
    pub async fn current(&self) -> Option<Decision> {
        self.state.lock().await.current.clone()
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.cached_user = None;
        state.generation += 1;
    }

    /// navigate
    ///
    /// Public pages commit immediately without a session fetch. Otherwise the cached user is
    /// used when present; if not, `Loading` is committed while the session is resolved.
    pub async fn navigate(&self, page: Page) -> Navigation {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        if page.is_public() {
            return self.commit(ticket, Decision::Render(page.canonical()), None, 0).await;
        }

        let (cached, generation) = {
            let state = self.state.lock().await;
            (state.cached_user.clone(), state.generation)
        };
        let session = match cached {
            Some(user) => Session::Active(user),
            None => {
                let loading = self.commit(ticket, Decision::Loading, None, generation).await;
                if loading == Navigation::Superseded {
                    return Navigation::Superseded;
                }
                self.session.resolve(self.token.as_deref()).await
            }
        };

        let decision = decide(&session, &page);
        let user = match session {
            Session::Active(user) => Some(user),
            _ => None,
        };
        self.commit(ticket, decision, user, generation).await
    }

    async fn commit(
        &self,
        ticket: u64,
        decision: Decision,
        user: Option<User>,
        generation: u64,
    ) -> Navigation {
        let mut state = self.state.lock().await;
        if ticket != self.issued.load(Ordering::SeqCst) {
            tracing::debug!(ticket, "navigation superseded, discarding decision");
            return Navigation::Superseded;
        }
        match user {
            Some(user) if state.generation == generation => state.cached_user = Some(user),
            Some(_) => tracing::debug!(ticket, "cache invalidated during fetch, not caching user"),
            None => {}
        }
        tracing::debug!(ticket, ?decision, "navigation committed");
        state.current = Some(decision.clone());
        Navigation::Applied(decision)
    }
}
