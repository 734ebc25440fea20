use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::utils::mask_secret;

/// A bearer credential that is known to be non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Rejects missing and blank tokens before anything goes out on the wire.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&mask_secret(&self.0)).finish()
    }
}

/// Result of a successful Keystone authentication.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub token: AuthToken,
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    pub fn summary(&self) -> AuthSummary {
        AuthSummary {
            user_id: self.user_id.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// What the console tells its client about a session; the token itself only
/// travels in the `X-Subject-Token` header and the cookie.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSummary {
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Keystone password credentials.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default = "default_user_domain")]
    pub user_domain: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_user_domain() -> String {
    crate::config::DEFAULT_USER_DOMAIN.to_string()
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .field("user_domain", &self.user_domain)
            .field("project_id", &self.project_id)
            .finish()
    }
}
