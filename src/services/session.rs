//! Auth session controller.
//!
//! ARCHITECTURE
//! ============
//! Keeps the local [`AuthStore`] consistent with the backend's authoritative
//! session. Bootstrap seeds the store once; afterwards a single listener task
//! applies backend notifications in delivery order. Sign-in and sign-up never
//! write the store themselves: the notification they trigger does.
//!
//! TRADE-OFFS
//! ==========
//! Every non-null notification refetches the profile, token refreshes
//! included. Profile rows are small and the extra call keeps the rule simple.
//! Fetches are neither deduplicated nor awaited by the listener; each one runs
//! as its own task, tagged with the store generation at issue time, and its
//! result is dropped if a later session change (or sign-out) happened before
//! it returned. Shutting the listener down aborts fetches still in flight.
//!
//! ERROR HANDLING
//! ==============
//! Profile-fetch failures are logged and swallowed; they never block
//! navigation. Backend rejections from sign-in, sign-up and password reset
//! propagate to the caller unchanged. Sign-out clears local state even when
//! the backend call fails, then reports that failure.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;

use serde_json::json;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{AuthBackend, BackendError, SessionChange, Subscription};
use crate::config::DEFAULT_RESET_REDIRECT;
use crate::model::{DISPLAY_NAME_KEY, Session, SessionEvent, SignUpOutcome};
use crate::state::auth::AuthStore;
use crate::state::query_cache::QueryCache;

/// Controller over an injected backend, store and query cache.
pub struct AuthController<B: ?Sized> {
    backend: Arc<B>,
    store: AuthStore,
    cache: QueryCache,
    reset_redirect: String,
}

impl<B: ?Sized> Clone for AuthController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            store: self.store.clone(),
            cache: self.cache.clone(),
            reset_redirect: self.reset_redirect.clone(),
        }
    }
}

impl<B: AuthBackend + ?Sized + 'static> AuthController<B> {
    pub fn new(backend: Arc<B>, store: AuthStore, cache: QueryCache) -> Self {
        Self { backend, store, cache, reset_redirect: DEFAULT_RESET_REDIRECT.to_owned() }
    }

    /// Override the deep link opened by password-reset emails.
    #[must_use]
    pub fn with_reset_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.reset_redirect = redirect.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Subscribe, bootstrap, then process notifications until the returned
    /// handle is shut down or dropped.
    ///
    /// Subscribing first means a notification that races bootstrap is queued
    /// and applied after it rather than lost.
    pub async fn start(&self) -> ControllerHandle {
        let subscription = self.backend.subscribe();
        self.bootstrap().await;
        let controller = self.clone();
        let task = tokio::spawn(async move { controller.listen(subscription).await });
        ControllerHandle { task: Some(task) }
    }

    async fn listen(&self, mut subscription: Subscription) {
        let mut fetches = JoinSet::new();
        loop {
            tokio::select! {
                change = subscription.next() => {
                    let Some(SessionChange { event, session }) = change else { break };
                    if let Some(user_id) = self.apply_session_change(event, session) {
                        let controller = self.clone();
                        fetches.spawn(async move { controller.fetch_profile(user_id).await });
                    }
                }
                Some(_) = fetches.join_next(), if !fetches.is_empty() => {}
            }
        }
        debug!("session notification stream closed");
        while fetches.join_next().await.is_some() {}
    }

    /// Resolve the initial session. `loading` becomes `false` whatever the
    /// outcome, including a backend failure.
    pub async fn bootstrap(&self) {
        let session = match self.backend.get_current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not read current session, starting signed out");
                None
            }
        };
        let user_id = session.as_ref().map(Session::user_id);
        match session {
            Some(session) => self.store.set_session(Some(session)),
            // Drops a profile rehydrated for an account that is gone.
            None => self.store.sign_out(),
        }
        self.store.set_loading(false);
        info!(signed_in = user_id.is_some(), "auth bootstrap complete");

        if let Some(user_id) = user_id {
            self.fetch_profile(user_id).await;
        }
    }

    /// Apply one session-change notification, then fetch the new owner's
    /// profile if there is one.
    pub async fn on_session_change(&self, event: SessionEvent, session: Option<Session>) {
        if let Some(user_id) = self.apply_session_change(event, session) {
            self.fetch_profile(user_id).await;
        }
    }

    /// Store half of a notification. Returns the user whose profile is due.
    fn apply_session_change(&self, event: SessionEvent, session: Option<Session>) -> Option<Uuid> {
        debug!(event = event.as_str(), signed_in = session.is_some(), "session change");
        match session {
            None => {
                self.store.sign_out();
                self.cache.clear();
                None
            }
            Some(session) => {
                let user_id = session.user_id();
                self.store.set_session(Some(session));
                Some(user_id)
            }
        }
    }

    /// Load the profile row for `user_id`. Success stores it unless a session
    /// change happened meanwhile; failure leaves the profile untouched.
    pub async fn fetch_profile(&self, user_id: Uuid) {
        let generation = self.store.generation();
        match self.backend.get_profile_by_id(user_id).await {
            Ok(profile) => {
                if !self.store.set_profile_if_current(generation, Some(profile)) {
                    debug!(%user_id, "discarding profile fetched for a superseded session");
                }
            }
            Err(BackendError::NotFound) => debug!(%user_id, "no profile row yet"),
            Err(e) => warn!(%user_id, error = %e, "profile fetch failed"),
        }
    }

    /// Check credentials with the backend. State updates arrive through the
    /// resulting notification.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), BackendError> {
        self.backend.sign_in_with_password(email, password).await
    }

    /// Create an account with `display_name` carried as sign-up metadata.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection unchanged, or a parse error if the
    /// backend reported neither a session nor a user.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let metadata = json!({ DISPLAY_NAME_KEY: display_name });
        let response = self.backend.sign_up(email, password, metadata).await?;
        match (response.session, response.user) {
            (Some(session), _) => Ok(SignUpOutcome::AutoConfirmed(session)),
            (None, Some(user)) => Ok(SignUpOutcome::ConfirmationPending(user)),
            (None, None) => Err(BackendError::Parse("sign-up returned neither session nor user".to_owned())),
        }
    }

    /// Sign out everywhere. Local state is cleared even if the backend call
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after local state has been cleared.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let result = self.backend.sign_out().await;
        if let Err(e) = &result {
            warn!(error = %e, "backend sign-out failed, clearing local state anyway");
        }
        self.store.sign_out();
        self.cache.clear();
        result
    }

    /// Email a password-reset link pointing at the configured deep link.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection unchanged.
    pub async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        self.backend.send_password_reset(email, &self.reset_redirect).await
    }
}

/// Owns the notification listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ControllerHandle {
    task: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Stop listening and wait until the subscription has been released.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
