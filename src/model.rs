//! Identity records shared by the backend adapter, the stores, and the
//! session controller.
//!
//! DESIGN
//! ======
//! `Session` and `User` mirror what the identity provider hands out; the
//! client never mints them. `Profile` is the application-level row from the
//! `profiles` table and is the only record this crate persists itself.

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Metadata key carrying the display name chosen at sign-up.
pub const DISPLAY_NAME_KEY: &str = "display_name";

// =============================================================================
// USER
// =============================================================================

/// Stable identity record owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata attached at sign-up (e.g. `display_name`).
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    /// Display name recorded in sign-up metadata, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.get(DISPLAY_NAME_KEY).and_then(Value::as_str)
    }
}

// =============================================================================
// SESSION
// =============================================================================

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Credential bundle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as unix seconds. `None` when the provider did not say.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

impl Session {
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// `true` once `now` (unix seconds) has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Row of the `profiles` table. `id` equals the owning user's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Kind of session-change notification pushed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl SessionEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
        }
    }
}

// =============================================================================
// SIGN-UP OUTCOME
// =============================================================================

/// Result of a successful sign-up. Callers must branch on it: only
/// `AutoConfirmed` yields a usable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in immediately.
    AutoConfirmed(Session),
    /// A confirmation email was sent; no session exists yet.
    ConfirmationPending(User),
}

impl SignUpOutcome {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::AutoConfirmed(session) => Some(session),
            Self::ConfirmationPending(_) => None,
        }
    }
}
