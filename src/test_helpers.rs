//! Fixtures and a scripted in-memory backend shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::backend::{AuthBackend, BackendError, SessionBroadcaster, SignUpResponse, Subscription};
use crate::model::{Profile, Session, SessionEvent, User};
use crate::state::auth::AuthStore;
use crate::state::query_cache::QueryCache;
use crate::storage::MemoryStorage;

#[must_use]
pub fn sample_user(email: &str) -> User {
    User { id: Uuid::new_v4(), email: Some(email.to_owned()), user_metadata: serde_json::Map::new() }
}

#[must_use]
pub fn sample_session(email: &str) -> Session {
    Session {
        access_token: format!("access-{email}"),
        refresh_token: format!("refresh-{email}"),
        expires_at: None,
        token_type: "bearer".to_owned(),
        user: sample_user(email),
    }
}

#[must_use]
pub fn sample_profile(id: Uuid, display_name: &str) -> Profile {
    Profile { id, display_name: display_name.to_owned(), avatar_url: None, created_at: None, updated_at: None }
}

#[must_use]
pub fn memory_store() -> AuthStore {
    AuthStore::new(Arc::new(MemoryStorage::new()))
}

/// Calls observed by [`FakeBackend`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetSession,
    SignIn { email: String },
    SignUp { email: String, metadata: Value },
    SignOut,
    Reset { email: String, redirect_to: String },
    Profile(Uuid),
}

/// Scripted backend. Sign-in/sign-up/sign-out emit notifications the way the
/// real backend does; failures are switched on per operation.
#[derive(Default)]
pub struct FakeBackend {
    pub current: Mutex<Option<Session>>,
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub accounts: Mutex<HashMap<String, Session>>,
    pub sign_up_response: Mutex<Option<SignUpResponse>>,
    pub events: SessionBroadcaster,
    pub calls: Mutex<Vec<Call>>,
    pub fail_get_session: AtomicBool,
    pub fail_sign_in: AtomicBool,
    pub fail_sign_up: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub fail_reset: AtomicBool,
    /// When set, the next profile lookup waits for this signal.
    pub profile_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend that restored `session` from its own storage.
    #[must_use]
    pub fn with_session(session: Session) -> Arc<Self> {
        let backend = Self::default();
        *backend.current.lock().unwrap() = Some(session);
        Arc::new(backend)
    }

    pub fn add_profile(&self, profile: Profile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }

    pub fn add_account(&self, session: Session) {
        let email = session.user.email.clone().unwrap_or_default();
        self.accounts.lock().unwrap().insert(email, session);
    }

    /// Hold the next profile lookup until the returned sender fires.
    pub fn gate_profile(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.profile_gate.lock().unwrap() = Some(rx);
        tx
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn profile_fetches(&self) -> Vec<Uuid> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Profile(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn rejected(message: &str) -> BackendError {
    BackendError::Api { status: 400, message: message.to_owned() }
}

#[async_trait::async_trait]
impl AuthBackend for FakeBackend {
    async fn get_current_session(&self) -> Result<Option<Session>, BackendError> {
        self.record(Call::GetSession);
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(BackendError::Request("offline".into()));
        }
        Ok(self.current.lock().unwrap().clone())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<(), BackendError> {
        self.record(Call::SignIn { email: email.to_owned() });
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(rejected("Invalid login credentials"));
        }
        let session = self
            .accounts
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| rejected("Invalid login credentials"))?;
        *self.current.lock().unwrap() = Some(session.clone());
        self.events.emit(SessionEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, _password: &str, metadata: Value) -> Result<SignUpResponse, BackendError> {
        self.record(Call::SignUp { email: email.to_owned(), metadata });
        if self.fail_sign_up.load(Ordering::SeqCst) {
            return Err(rejected("User already registered"));
        }
        let response = self.sign_up_response.lock().unwrap().clone().unwrap_or_default();
        if let Some(session) = &response.session {
            *self.current.lock().unwrap() = Some(session.clone());
            self.events.emit(SessionEvent::SignedIn, Some(session.clone()));
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record(Call::SignOut);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(BackendError::Request("offline".into()));
        }
        *self.current.lock().unwrap() = None;
        self.events.emit(SessionEvent::SignedOut, None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError> {
        self.record(Call::Reset { email: email.to_owned(), redirect_to: redirect_to.to_owned() });
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err(rejected("For security purposes, you can only request this once every 60 seconds"));
        }
        Ok(())
    }

    async fn get_profile_by_id(&self, id: Uuid) -> Result<Profile, BackendError> {
        self.record(Call::Profile(id));
        let gate = self.profile_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.profiles.lock().unwrap().get(&id).cloned().ok_or(BackendError::NotFound)
    }
}

/// Fresh store, cache and fake backend wired together.
#[must_use]
pub fn fixture(backend: Arc<FakeBackend>) -> (Arc<FakeBackend>, AuthStore, QueryCache) {
    (backend, memory_store(), QueryCache::new())
}
