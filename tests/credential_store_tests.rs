use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{Duration, TimeZone, Utc};

use kcdeploy::models::{AuthSession, AuthToken};
use kcdeploy::services::{
    clear_session, cookie_max_age, load_credentials, store_session, CookieStore, CredentialStore, ScopedSession,
    AUTH_TOKEN_KEY, USER_ID_KEY,
};

fn session(expires_in: Option<Duration>) -> AuthSession {
    AuthSession {
        token: AuthToken::parse("gAAAAAB-subject").unwrap(),
        user_id: "u-42".to_string(),
        expires_at: expires_in.map(|d| Utc::now() + d),
    }
}

#[test]
fn test_cookie_store_round_trip() {
    let mut store = CookieStore::new(CookieJar::new());
    store_session(&mut store, &session(None));

    let (token, user_id) = load_credentials(&store).unwrap();
    assert_eq!(token.as_str(), "gAAAAAB-subject");
    assert_eq!(user_id, "u-42");

    let jar = store.into_jar();
    let cookie = jar.get(AUTH_TOKEN_KEY).unwrap();
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn test_cookie_store_applies_max_age() {
    let mut store = CookieStore::new(CookieJar::new()).with_max_age(Some(time::Duration::seconds(90)));
    store.set(USER_ID_KEY, "u-1".to_string());
    let jar = store.into_jar();
    assert_eq!(jar.get(USER_ID_KEY).unwrap().max_age(), Some(time::Duration::seconds(90)));
}

#[test]
fn test_blank_token_cookie_is_ignored() {
    let jar = CookieJar::new()
        .add(Cookie::new(AUTH_TOKEN_KEY, ""))
        .add(Cookie::new(USER_ID_KEY, "u-1"));
    assert!(load_credentials(&CookieStore::new(jar)).is_none());
}

#[test]
fn test_clear_session_removes_both_keys() {
    let mut store = CookieStore::new(CookieJar::new());
    store_session(&mut store, &session(None));
    clear_session(&mut store);
    assert!(store.get(AUTH_TOKEN_KEY).is_none());
    assert!(store.get(USER_ID_KEY).is_none());
}

#[test]
fn test_cookie_max_age_follows_token_expiry() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let mut s = session(None);
    assert_eq!(cookie_max_age(&s, now), None);

    s.expires_at = Some(now + Duration::hours(1));
    assert_eq!(cookie_max_age(&s, now), Some(time::Duration::seconds(3600)));

    s.expires_at = Some(now - Duration::minutes(5));
    assert_eq!(cookie_max_age(&s, now), Some(time::Duration::seconds(0)));
}

#[test]
fn test_scoped_session_expires() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let mut scoped = ScopedSession::new(Some(now + Duration::minutes(10)));
    scoped.set(USER_ID_KEY, "u-1".to_string());

    assert_eq!(scoped.get_at(USER_ID_KEY, now), Some("u-1".to_string()));
    assert_eq!(scoped.get_at(USER_ID_KEY, now + Duration::minutes(10)), None);

    scoped.extend_until(Some(now + Duration::hours(1)));
    assert_eq!(scoped.get_at(USER_ID_KEY, now + Duration::minutes(30)), Some("u-1".to_string()));
}

#[test]
fn test_scoped_session_invalidate_is_final() {
    let mut scoped = ScopedSession::new(None);
    store_session(&mut scoped, &session(Some(Duration::hours(1))));
    assert!(load_credentials(&scoped).is_some());

    scoped.invalidate();
    assert!(load_credentials(&scoped).is_none());

    scoped.set(USER_ID_KEY, "late".to_string());
    assert!(scoped.get(USER_ID_KEY).is_none());
}
