//! Auth-session state for the signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Written by the session controller, read by the root router guard and by
//! anything that renders identity. Observers subscribe through a `watch`
//! channel and always see whole snapshots.
//!
//! PERSISTENCE
//! ===========
//! Only the profile is written to durable storage, as [`PersistedAuth`] under
//! [`AUTH_STORAGE_KEY`]. Session and user are re-acquired from the identity
//! provider on every launch, so the credential has a single source of truth.
//! The persisted profile is a cold-start placeholder that bootstrap replaces.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::model::{Profile, Session, User};
use crate::storage::{KeyValueStorage, load_json, save_json};

/// Durable key holding the persisted projection.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// In-memory authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    /// `true` until bootstrap has resolved the initial session.
    pub loading: bool,
    /// Bumped on every session replacement and sign-out. Profile fetches
    /// issued under an older generation are discarded.
    pub generation: u64,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { session: None, user: None, profile: None, loading: true, generation: 0 }
    }
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// The slice of [`AuthState`] that survives a restart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAuth {
    pub profile: Option<Profile>,
}

impl From<&AuthState> for PersistedAuth {
    fn from(state: &AuthState) -> Self {
        Self { profile: state.profile.clone() }
    }
}

/// Shared handle to the auth state. Clones observe and mutate the same state.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<watch::Sender<AuthState>>,
    storage: Arc<dyn KeyValueStorage>,
}

impl AuthStore {
    /// Fresh store with the initial state and nothing loaded from storage.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_state(storage, AuthState::default())
    }

    /// Store seeded with the profile persisted by a previous run, if any.
    pub fn rehydrate(storage: Arc<dyn KeyValueStorage>) -> Self {
        let persisted: PersistedAuth = load_json(storage.as_ref(), AUTH_STORAGE_KEY).unwrap_or_default();
        let state = AuthState { profile: persisted.profile, ..AuthState::default() };
        Self::with_state(storage, state)
    }

    fn with_state(storage: Arc<dyn KeyValueStorage>, state: AuthState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { state: Arc::new(tx), storage }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Replace the session; the user follows the session's owner.
    pub fn set_session(&self, session: Option<Session>) {
        self.state.send_modify(|state| {
            state.user = session.as_ref().map(|s| s.user.clone());
            state.session = session;
            state.generation += 1;
        });
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|state| state.user = user);
    }

    pub fn set_profile(&self, profile: Option<Profile>) {
        self.state.send_modify(|state| state.profile = profile);
        self.persist();
    }

    /// Set the profile only if no session change happened since `generation`
    /// was read. Returns whether the profile was applied.
    pub fn set_profile_if_current(&self, generation: u64, profile: Option<Profile>) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.profile = profile;
            true
        });
        if applied {
            self.persist();
        }
        applied
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.loading = loading);
    }

    /// Null session, user and profile in a single update.
    pub fn sign_out(&self) {
        self.state.send_modify(|state| {
            state.session = None;
            state.user = None;
            state.profile = None;
            state.generation += 1;
        });
        self.persist();
    }

    /// Wait until the signed-in user's own profile is in the store, for at
    /// most `limit`. Returns whether it arrived.
    pub async fn profile_loaded(&self, limit: Duration) -> bool {
        let mut rx = self.subscribe();
        let loaded = rx.wait_for(|s| match (&s.user, &s.profile) {
            (Some(user), Some(profile)) => user.id == profile.id,
            _ => false,
        });
        match tokio::time::timeout(limit, loaded).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "auth state closed before the profile loaded");
                false
            }
            Err(_) => {
                debug!(limit_secs = limit.as_secs(), "profile did not load in time");
                false
            }
        }
    }

    fn persist(&self) {
        let projection = PersistedAuth::from(&*self.state.borrow());
        if let Err(e) = save_json(self.storage.as_ref(), AUTH_STORAGE_KEY, &projection) {
            warn!(error = %e, "failed to persist auth state");
        }
    }
}
