//! Root router guard and post-action routes.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard decides, once, where the app lands after bootstrap: the tab area
//! for a signed-in user, the welcome flow otherwise. Later sign-outs are
//! handled by screens routing through [`route_after_sign_out`] and by
//! [`evaluate`] seeing the null session; the guard itself never re-runs and
//! never returns to `Loading`.

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::model::SignUpOutcome;
use crate::state::auth::{AuthState, AuthStore};

/// Navigation targets the auth flow can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Tabs,
    Welcome,
    Login,
    SignUp,
    ForgotPassword,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Tabs => "/(tabs)",
            Self::Welcome => "/(auth)/welcome",
            Self::Login => "/(auth)/login",
            Self::SignUp => "/(auth)/signup",
            Self::ForgotPassword => "/(auth)/forgot-password",
        }
    }
}

/// Performs a route transition. Only the route name is part of the contract.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuardState {
    #[default]
    Loading,
    Authenticated,
    Unauthenticated,
}

impl GuardState {
    /// Where the guard sends the user in this state.
    #[must_use]
    pub fn redirect(self) -> Option<Route> {
        match self {
            Self::Loading => None,
            Self::Authenticated => Some(Route::Tabs),
            Self::Unauthenticated => Some(Route::Welcome),
        }
    }
}

/// Guard state implied by an auth snapshot.
#[must_use]
pub fn evaluate(state: &AuthState) -> GuardState {
    if state.loading {
        GuardState::Loading
    } else if state.session.is_some() {
        GuardState::Authenticated
    } else {
        GuardState::Unauthenticated
    }
}

/// One-shot guard: leaves `Loading` exactly once.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootGuard {
    state: GuardState,
}

impl RootGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Feed a snapshot. Returns the redirect when this snapshot completes
    /// loading; `None` before that and forever after.
    pub fn observe(&mut self, auth: &AuthState) -> Option<Route> {
        if self.state != GuardState::Loading {
            return None;
        }
        let next = evaluate(auth);
        if next == GuardState::Loading {
            return None;
        }
        self.state = next;
        next.redirect()
    }
}

/// Watch `store` and issue the single post-bootstrap redirect through
/// `navigator`. The task ends after redirecting and yields the guard state.
pub fn install_root_redirect<N>(store: &AuthStore, navigator: Arc<N>) -> JoinHandle<GuardState>
where
    N: Navigator + ?Sized + 'static,
{
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut guard = RootGuard::new();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if let Some(route) = guard.observe(&snapshot) {
                info!(route = route.path(), "root redirect");
                navigator.navigate(route);
                return guard.state();
            }
            if rx.changed().await.is_err() {
                return guard.state();
            }
        }
    })
}

/// Landing route after a successful password sign-in.
#[must_use]
pub fn route_after_sign_in() -> Route {
    Route::Tabs
}

/// Landing route after sign-up: the tabs when auto-confirmed, otherwise the
/// login screen while the confirmation email is pending.
#[must_use]
pub fn route_after_sign_up(outcome: &SignUpOutcome) -> Route {
    match outcome {
        SignUpOutcome::AutoConfirmed(_) => Route::Tabs,
        SignUpOutcome::ConfirmationPending(_) => Route::Login,
    }
}

/// Landing route after signing out from the profile screen.
#[must_use]
pub fn route_after_sign_out() -> Route {
    Route::Login
}
