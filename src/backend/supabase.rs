//! Supabase-style backend over HTTP: GoTrue auth endpoints plus a PostgREST
//! `profiles` table.
//!
//! Thin wrapper around `reqwest`. Wire parsing lives in pure `parse_*`
//! functions so it can be tested without a server.
//!
//! SESSION OWNERSHIP
//! =================
//! The backend keeps its own copy of the session under
//! [`SESSION_STORAGE_KEY`] and restores it on launch. Local sign-out always
//! drops that copy, even when the logout request fails.

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::ACCEPT;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{SessionBroadcaster, Subscription};
use super::types::{AuthBackend, BackendError, SignUpResponse};
use crate::config::BackendConfig;
use crate::model::{Profile, Session, SessionEvent, User};
use crate::storage::{KeyValueStorage, load_json, save_json};

/// Durable key for the backend's own session copy.
pub const SESSION_STORAGE_KEY: &str = "backend-session";

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";
const PGRST_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// PostgREST answers 406 when a single-object request matches no row.
const PGRST_NO_ROW_STATUS: u16 = 406;

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseBackend {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    storage: Arc<dyn KeyValueStorage>,
    session: RwLock<Option<Session>>,
    events: SessionBroadcaster,
}

impl SupabaseBackend {
    /// Build the client and restore any session persisted by a previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig, storage: Arc<dyn KeyValueStorage>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        let session = load_json::<Session>(storage.as_ref(), SESSION_STORAGE_KEY);
        debug!(restored = session.is_some(), "backend session loaded");
        Ok(Self {
            http,
            url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            storage,
            session: RwLock::new(session),
            events: SessionBroadcaster::new(),
        })
    }

    fn current(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Token for `Authorization`: the user's access token when signed in,
    /// otherwise the anon key.
    fn bearer(&self) -> String {
        self.current().map_or_else(|| self.anon_key.clone(), |s| s.access_token)
    }

    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}{AUTH_PATH}{path}", self.url)
    }

    fn store_session(&self, session: Option<Session>) {
        let result = match &session {
            Some(s) => save_json(self.storage.as_ref(), SESSION_STORAGE_KEY, s),
            None => self.storage.remove_item(SESSION_STORAGE_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist backend session");
        }
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn post_auth(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<String, BackendError> {
        let response = self
            .http
            .post(self.auth_endpoint(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_body(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let text = self
            .post_auth(
                "/token",
                &[("grant_type", "refresh_token")],
                &json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        parse_session(&text, unix_now())
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseBackend {
    async fn get_current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.is_expired_at(unix_now()) {
            return Ok(Some(session));
        }

        debug!(user_id = %session.user_id(), "stored session expired, refreshing");
        match self.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                self.store_session(Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e @ BackendError::Api { .. }) => {
                info!(error = %e, "refresh token rejected, dropping stored session");
                self.store_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let text = self
            .post_auth(
                "/token",
                &[("grant_type", "password")],
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = parse_session(&text, unix_now())?;
        info!(user_id = %session.user_id(), "signed in");
        self.store_session(Some(session.clone()));
        self.events.emit(SessionEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpResponse, BackendError> {
        let text = self
            .post_auth(
                "/signup",
                &[],
                &json!({ "email": email, "password": password, "data": metadata }),
                None,
            )
            .await?;
        let response = parse_sign_up(&text, unix_now())?;
        if let Some(session) = &response.session {
            info!(user_id = %session.user_id(), "signed up and auto-confirmed");
            self.store_session(Some(session.clone()));
            self.events.emit(SessionEvent::SignedIn, Some(session.clone()));
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = match self.current() {
            Some(session) => self
                .post_auth("/logout", &[], &json!({}), Some(&session.access_token))
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        self.store_session(None);
        self.events.emit(SessionEvent::SignedOut, None);
        result
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError> {
        self.post_auth("/recover", &[("redirect_to", redirect_to)], &json!({ "email": email }), None)
            .await
            .map(|_| ())
    }

    async fn get_profile_by_id(&self, id: Uuid) -> Result<Profile, BackendError> {
        let filter = format!("eq.{id}");
        let response = self
            .http
            .get(format!("{}{REST_PATH}/profiles", self.url))
            .query(&[("id", filter.as_str()), ("select", "*")])
            .header("apikey", &self.anon_key)
            .header(ACCEPT, PGRST_SINGLE_OBJECT)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if response.status().as_u16() == PGRST_NO_ROW_STATUS {
            return Err(BackendError::NotFound);
        }
        let text = read_body(response).await?;
        parse_profile(&text)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        return Err(BackendError::Api { status, message: parse_error_message(status, &text) });
    }
    Ok(text)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self.expires_at.or_else(|| self.expires_in.map(|secs| now + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_owned()),
            user: self.user,
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_session(json: &str, now: i64) -> Result<Session, BackendError> {
    let token: TokenResponse = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(token.into_session(now))
}

fn parse_profile(json: &str) -> Result<Profile, BackendError> {
    serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Sign-up answers with a full token response when the account is
/// auto-confirmed, and with the bare user (top level or under `user`) when a
/// confirmation email was sent.
fn parse_sign_up(json: &str, now: i64) -> Result<SignUpResponse, BackendError> {
    let value: Value = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;

    if value.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))?;
        let session = token.into_session(now);
        return Ok(SignUpResponse { user: Some(session.user.clone()), session: Some(session) });
    }

    let user_value = match value.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => value,
    };
    let user: User = serde_json::from_value(user_value).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(SignUpResponse { session: None, user: Some(user) })
}

/// Best user-facing message from an error body. GoTrue has used `msg`,
/// `message`, `error_description` and `error` across versions.
fn parse_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return text.trim().to_owned();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') {
        format!("request failed with status {status}")
    } else {
        trimmed.to_owned()
    }
}
