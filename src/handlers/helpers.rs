use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use rand::RngCore;
use serde::Serialize;

use crate::models::{AppState, AuthSession, Notification};
use crate::services::{cookie_max_age, store_session, CookieStore};

pub const SESSION_COOKIE: &str = "session_id";

/// Success envelope shared by every JSON endpoint.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub data: T,
}

pub fn ok_json<T: Serialize>(data: T) -> Response {
    json_with_status(StatusCode::OK, data)
}

pub fn json_with_status<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Envelope {
            status: status.as_u16(),
            data,
        }),
    )
        .into_response()
}

pub fn random_session_id() -> String {
    let mut b = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut b);
    hex::encode(b)
}

pub fn session_id_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// The caller's console session id, minting one (and its cookie) on first
/// contact.
pub fn ensure_session(jar: CookieJar) -> (CookieJar, String) {
    if let Some(sid) = session_id_from_jar(&jar) {
        return (jar, sid);
    }
    let sid = random_session_id();
    let mut cookie = Cookie::new(SESSION_COOKIE, sid.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    tracing::debug!("Issued new console session");
    (jar.add(cookie), sid)
}

pub fn push_notifications(state: &AppState, sid: &str, notifications: Vec<Notification>) {
    if !notifications.is_empty() {
        state.notifications.extend(sid, notifications);
    }
}

/// Write the OpenStack token and user id cookies, expiring with the token.
pub fn remember_openstack_session(jar: CookieJar, session: &AuthSession) -> CookieJar {
    let mut store = CookieStore::new(jar).with_max_age(cookie_max_age(session, Utc::now()));
    store_session(&mut store, session);
    store.into_jar()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_random_hex() {
        let a = random_session_id();
        let b = random_session_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn existing_session_is_kept() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "abc"));
        let (_, sid) = ensure_session(jar);
        assert_eq!(sid, "abc");
    }

    #[test]
    fn missing_session_gets_cookie() {
        let (jar, sid) = ensure_session(CookieJar::new());
        assert_eq!(jar.get(SESSION_COOKIE).map(|c| c.value().to_string()), Some(sid));
    }
}
