//! Where the OpenStack token and user id live between wizard steps.
use std::collections::HashMap;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

use crate::models::{AuthSession, AuthToken};

pub const AUTH_TOKEN_KEY: &str = "openstack_auth_token";
pub const USER_ID_KEY: &str = "openstack_user_id";

pub trait CredentialStore {
    fn set(&mut self, key: &str, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&mut self, key: &str);
}

/// Cookie-backed store. Values are stored in clear text; the cookie's own
/// `Max-Age` is the only expiry.
#[derive(Clone, Debug, Default)]
pub struct CookieStore {
    jar: CookieJar,
    max_age: Option<time::Duration>,
}

impl CookieStore {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar, max_age: None }
    }

    /// Bound cookies written from now on to the given lifetime.
    pub fn with_max_age(mut self, max_age: Option<time::Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl CredentialStore for CookieStore {
    fn set(&mut self, key: &str, value: String) {
        let mut cookie = Cookie::new(key.to_string(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        if let Some(age) = self.max_age {
            cookie.set_max_age(age);
        }
        let jar = std::mem::take(&mut self.jar);
        self.jar = jar.add(cookie);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.jar
            .get(key)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn remove(&mut self, key: &str) {
        let jar = std::mem::take(&mut self.jar);
        let mut cookie = Cookie::new(key.to_string(), "");
        cookie.set_path("/");
        self.jar = jar.remove(cookie);
    }
}

/// In-memory store with an explicitly managed lifetime. Once expired or
/// invalidated it behaves as empty.
#[derive(Clone, Debug, Default)]
pub struct ScopedSession {
    values: HashMap<String, String>,
    expires_at: Option<DateTime<Utc>>,
    invalidated: bool,
}

impl ScopedSession {
    pub fn new(expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            values: HashMap::new(),
            expires_at,
            invalidated: false,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && self.expires_at.map(|exp| now < exp).unwrap_or(true)
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        if !self.is_active_at(now) {
            return None;
        }
        self.values.get(key).cloned()
    }

    pub fn extend_until(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }

    pub fn invalidate(&mut self) {
        self.values.clear();
        self.invalidated = true;
    }
}

impl CredentialStore for ScopedSession {
    fn set(&mut self, key: &str, value: String) {
        if self.invalidated {
            tracing::debug!(key, "Ignoring write to invalidated session");
            return;
        }
        self.values.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Remaining lifetime of a session as a cookie max-age.
pub fn cookie_max_age(session: &AuthSession, now: DateTime<Utc>) -> Option<time::Duration> {
    let exp = session.expires_at?;
    let secs = (exp - now).num_seconds().max(0);
    Some(time::Duration::seconds(secs))
}

pub fn store_session(store: &mut impl CredentialStore, session: &AuthSession) {
    store.set(AUTH_TOKEN_KEY, session.token.as_str().to_string());
    store.set(USER_ID_KEY, session.user_id.clone());
}

/// Token and user id, if both are present and the token is non-empty.
pub fn load_credentials(store: &impl CredentialStore) -> Option<(AuthToken, String)> {
    let token = AuthToken::parse(&store.get(AUTH_TOKEN_KEY)?).ok()?;
    let user_id = store.get(USER_ID_KEY)?;
    Some((token, user_id))
}

pub fn clear_session(store: &mut impl CredentialStore) {
    store.remove(AUTH_TOKEN_KEY);
    store.remove(USER_ID_KEY);
}
