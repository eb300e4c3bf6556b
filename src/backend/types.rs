//! Backend contract: the identity provider plus the `profiles` data store.
//!
//! Provider-neutral types shared by the HTTP adapter and the session
//! controller. The controller only ever sees [`AuthBackend`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::Subscription;
use crate::model::{Profile, Session, User};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend rejected the call. `message` is safe to show to the user.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// A single-row lookup matched nothing.
    #[error("no matching row")]
    NotFound,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// SIGN-UP
// =============================================================================

/// Raw sign-up result. A session is present only when the account was
/// auto-confirmed; otherwise the backend sent a confirmation email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub session: Option<Session>,
    pub user: Option<User>,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Everything the session controller needs from the backend.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// The session the backend restored from its own storage, if any.
    async fn get_current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Register for session-change notifications. Dropping the returned
    /// [`Subscription`] unsubscribes.
    fn subscribe(&self) -> Subscription;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpResponse, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Email a password-reset link that opens `redirect_to`.
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError>;

    /// Single-row lookup in `profiles`. Missing rows are [`BackendError::NotFound`].
    async fn get_profile_by_id(&self, id: Uuid) -> Result<Profile, BackendError>;
}
