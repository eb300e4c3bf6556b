//! Runtime configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

pub const DEFAULT_RESET_REDIRECT: &str = "recipeapp://reset-password";
pub const DEFAULT_STORAGE_DIR: &str = ".recipebox";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Where and how to reach the backend-as-a-service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL without a trailing slash.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    /// Deep link opened by password-reset emails.
    pub reset_redirect: String,
    /// Directory for durable client state.
    pub storage_dir: PathBuf,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `RECIPEBOX_RESET_REDIRECT`: default `recipeapp://reset-password`
    /// - `RECIPEBOX_STORAGE_DIR`: default `.recipebox`
    /// - `RECIPEBOX_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RECIPEBOX_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = normalize_url(&required("SUPABASE_URL")?)?;
        let anon_key = required("SUPABASE_ANON_KEY")?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("RECIPEBOX_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("RECIPEBOX_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let reset_redirect =
            std::env::var("RECIPEBOX_RESET_REDIRECT").unwrap_or_else(|_| DEFAULT_RESET_REDIRECT.to_owned());
        let storage_dir = std::env::var("RECIPEBOX_STORAGE_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);

        Ok(Self { backend: BackendConfig { url, anon_key, timeouts }, reset_redirect, storage_dir })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_owned()),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn normalize_url(raw: &str) -> Result<String, ConfigError> {
    if !(raw.starts_with("https://") || raw.starts_with("http://")) {
        return Err(ConfigError::Invalid { var: "SUPABASE_URL", reason: format!("expected http(s) URL, got {raw:?}") });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
