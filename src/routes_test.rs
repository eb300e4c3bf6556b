use super::*;
use crate::test_helpers::{memory_store, sample_session, sample_user};
use std::sync::Mutex;

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

fn state(loading: bool, signed_in: bool) -> AuthState {
    let session = signed_in.then(|| sample_session("a@example.com"));
    AuthState { user: session.as_ref().map(|s| s.user.clone()), session, loading, ..AuthState::default() }
}

// =============================================================================
// evaluate
// =============================================================================

#[test]
fn evaluate_loading_wins() {
    assert_eq!(evaluate(&state(true, false)), GuardState::Loading);
    assert_eq!(evaluate(&state(true, true)), GuardState::Loading);
}

#[test]
fn evaluate_after_loading() {
    assert_eq!(evaluate(&state(false, true)), GuardState::Authenticated);
    assert_eq!(evaluate(&state(false, false)), GuardState::Unauthenticated);
}

#[test]
fn redirect_targets() {
    assert_eq!(GuardState::Loading.redirect(), None);
    assert_eq!(GuardState::Authenticated.redirect(), Some(Route::Tabs));
    assert_eq!(GuardState::Unauthenticated.redirect(), Some(Route::Welcome));
    assert_eq!(Route::Tabs.path(), "/(tabs)");
    assert_eq!(Route::Welcome.path(), "/(auth)/welcome");
}

// =============================================================================
// RootGuard
// =============================================================================

#[test]
fn guard_waits_while_loading() {
    let mut guard = RootGuard::new();
    assert_eq!(guard.observe(&state(true, false)), None);
    assert_eq!(guard.state(), GuardState::Loading);
}

#[test]
fn guard_redirects_once_then_stays_put() {
    let mut guard = RootGuard::new();
    assert_eq!(guard.observe(&state(false, true)), Some(Route::Tabs));
    assert_eq!(guard.state(), GuardState::Authenticated);

    // Later sign-out is navigation's job, not the guard's.
    assert_eq!(guard.observe(&state(false, false)), None);
    assert_eq!(guard.observe(&state(true, false)), None);
    assert_eq!(guard.state(), GuardState::Authenticated);
}

#[test]
fn guard_unauthenticated_goes_to_welcome() {
    let mut guard = RootGuard::new();
    assert_eq!(guard.observe(&state(false, false)), Some(Route::Welcome));
    assert_eq!(guard.state(), GuardState::Unauthenticated);
}

// =============================================================================
// install_root_redirect
// =============================================================================

#[tokio::test]
async fn install_root_redirect_fires_when_loading_completes() {
    let store = memory_store();
    let navigator = Arc::new(RecordingNavigator::default());
    let task = install_root_redirect(&store, Arc::clone(&navigator));

    tokio::task::yield_now().await;
    assert!(navigator.routes.lock().unwrap().is_empty());

    store.set_session(Some(sample_session("a@example.com")));
    store.set_loading(false);

    assert_eq!(task.await.unwrap(), GuardState::Authenticated);
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Tabs]);
}

#[tokio::test]
async fn install_root_redirect_after_loading_already_done() {
    let store = memory_store();
    store.set_loading(false);
    let navigator = Arc::new(RecordingNavigator::default());

    let state = install_root_redirect(&store, Arc::clone(&navigator)).await.unwrap();
    assert_eq!(state, GuardState::Unauthenticated);
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Welcome]);
}

// =============================================================================
// post-action routes
// =============================================================================

#[test]
fn post_action_routes() {
    assert_eq!(route_after_sign_in(), Route::Tabs);
    assert_eq!(route_after_sign_out(), Route::Login);
    assert_eq!(route_after_sign_up(&SignUpOutcome::AutoConfirmed(sample_session("a@example.com"))), Route::Tabs);
    assert_eq!(route_after_sign_up(&SignUpOutcome::ConfirmationPending(sample_user("a@example.com"))), Route::Login);
}
