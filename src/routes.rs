use axum::http::HeaderName;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::identity::SUBJECT_TOKEN_HEADER;
use crate::handlers;
use crate::models::AppState;

pub fn build_router(state: AppState) -> Router {
    let openstack = Router::new()
        .route("/flavors", get(handlers::flavors_get))
        .route("/keypairs", get(handlers::keypairs_get))
        .route("/networks", get(handlers::networks_get))
        .route("/auth", post(handlers::auth_post))
        .route("/instances", post(handlers::instances_post))
        .route("/logout", post(handlers::logout_post));

    let wizard = Router::new()
        .route("/", get(handlers::wizard_get).delete(handlers::wizard_delete))
        .route("/start", post(handlers::wizard_start))
        .route("/submit", post(handlers::wizard_submit))
        .route("/retry", post(handlers::wizard_retry))
        .route("/back", post(handlers::wizard_back));

    let config = Router::new()
        .route("/", get(handlers::config_get))
        .route("/realm", put(handlers::realm_put))
        .route("/client", put(handlers::client_put))
        .route("/tokens", put(handlers::tokens_put))
        .route("/export", get(handlers::config_export));

    // The browser client reads the subject token from the auth response.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SUBJECT_TOKEN_HEADER)]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/notifications", get(handlers::notifications_get))
        .route("/api/users", get(handlers::users_list).post(handlers::users_create))
        .route("/api/users/:id", put(handlers::users_update).delete(handlers::users_delete))
        .nest("/api/openstack", openstack)
        .nest("/api/wizard", wizard)
        .nest("/api/config", config)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::{MockKeycloakAdminApi, MockOpenStackApi};
    use crate::error::ApiError;
    use crate::models::{AuthSession, AuthToken, Flavor, KeycloakUser};

    fn app(openstack: MockOpenStackApi, keycloak: MockKeycloakAdminApi) -> Router {
        build_router(state(openstack, keycloak))
    }

    fn state(openstack: MockOpenStackApi, keycloak: MockKeycloakAdminApi) -> AppState {
        AppState::new(Arc::new(openstack), Arc::new(keycloak), None)
    }

    fn messages(state: &AppState, sid: &str) -> Vec<String> {
        state.notifications.drain(sid).into_iter().map(|n| n.message).collect()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn flavors_without_token_is_unauthorized() {
        let mut openstack = MockOpenStackApi::new();
        openstack.expect_list_flavors().never();
        let response = app(openstack, MockKeycloakAdminApi::new())
            .oneshot(Request::get("/api/openstack/flavors").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn flavors_are_wrapped_in_envelope() {
        let mut openstack = MockOpenStackApi::new();
        openstack
            .expect_list_flavors()
            .withf(|token| token.as_str() == "tok-1")
            .returning(|_| {
                Ok(vec![Flavor {
                    id: "1".into(),
                    name: "m1.small".into(),
                    vcpus: 1,
                    ram: 2048,
                    disk: 20,
                }])
            });
        let response = app(openstack, MockKeycloakAdminApi::new())
            .oneshot(
                Request::get("/api/openstack/flavors")
                    .header("X-Auth-Token", "tok-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["data"][0]["name"], "m1.small");
    }

    #[tokio::test]
    async fn upstream_status_is_carried_through() {
        let mut openstack = MockOpenStackApi::new();
        openstack
            .expect_list_keypairs()
            .returning(|_| Err(ApiError::AuthRejected("token expired".into())));
        let response = app(openstack, MockKeycloakAdminApi::new())
            .oneshot(
                Request::get("/api/openstack/keypairs")
                    .header("X-Auth-Token", "stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "auth_rejected");
    }

    #[tokio::test]
    async fn auth_sets_subject_token_header_and_cookies() {
        let mut openstack = MockOpenStackApi::new();
        openstack.expect_authenticate().times(1).returning(|_| {
            Ok(AuthSession {
                token: AuthToken::parse("subject-123").unwrap(),
                user_id: "u-9".into(),
                expires_at: None,
            })
        });
        let body = json!({"username": "demo", "password": "pw"});
        let response = app(openstack, MockKeycloakAdminApi::new())
            .oneshot(
                Request::post("/api/openstack/auth")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-subject-token"], "subject-123");
        let cookies: Vec<String> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("openstack_auth_token=subject-123")));
        assert!(cookies.iter().any(|c| c.starts_with("openstack_user_id=u-9")));
        assert_eq!(body_json(response).await["data"]["userId"], "u-9");
    }

    #[tokio::test]
    async fn users_require_bearer_token() {
        let mut keycloak = MockKeycloakAdminApi::new();
        keycloak.expect_list_users().never();
        let response = app(MockOpenStackApi::new(), keycloak)
            .oneshot(
                Request::get("/api/users")
                    .header("authorization", "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_are_filtered_by_email() {
        let mut keycloak = MockKeycloakAdminApi::new();
        keycloak.expect_list_users().returning(|_| {
            Ok(vec![
                KeycloakUser {
                    id: Some("1".into()),
                    username: "alice".into(),
                    email: Some("Alice@Example.org".into()),
                    ..Default::default()
                },
                KeycloakUser {
                    id: Some("2".into()),
                    username: "bob".into(),
                    email: Some("bob@other.net".into()),
                    ..Default::default()
                },
            ])
        });
        let response = app(MockOpenStackApi::new(), keycloak)
            .oneshot(
                Request::get("/api/users?email=example")
                    .header("authorization", "Bearer admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_count"], 1);
        assert_eq!(body["data"]["items"][0]["username"], "alice");
    }

    #[tokio::test]
    async fn export_is_an_attachment() {
        let response = app(MockOpenStackApi::new(), MockKeycloakAdminApi::new())
            .oneshot(Request::get("/api/config/export").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"keycloak-config.json\""
        );
        let body = body_json(response).await;
        assert_eq!(body["realm"], "keycloak");
    }

    #[tokio::test]
    async fn wizard_submit_without_credentials_is_rejected() {
        let mut openstack = MockOpenStackApi::new();
        openstack.expect_authenticate().never();
        let body = json!({"flavor": "1", "keypair": "k1", "network": "n1", "port": "8080"});
        let response = app(openstack, MockKeycloakAdminApi::new())
            .oneshot(
                Request::post("/api/wizard/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["fields"][0]["field"], "credentials");
    }

    #[tokio::test]
    async fn unreachable_identity_is_not_reported_as_bad_credentials() {
        let mut openstack = MockOpenStackApi::new();
        openstack
            .expect_authenticate()
            .returning(|_| Err(ApiError::UpstreamUnavailable("connection refused".into())));
        let state = state(openstack, MockKeycloakAdminApi::new());
        let body = json!({"username": "demo", "password": "pw"});
        let response = build_router(state.clone())
            .oneshot(
                Request::post("/api/openstack/auth")
                    .header("content-type", "application/json")
                    .header("cookie", "session_id=s1")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(messages(&state, "s1"), vec!["Could not reach OpenStack Identity"]);
    }

    #[tokio::test]
    async fn rejected_password_is_reported_as_bad_credentials() {
        let mut openstack = MockOpenStackApi::new();
        openstack
            .expect_authenticate()
            .returning(|_| Err(ApiError::AuthRejected("bad password".into())));
        let state = state(openstack, MockKeycloakAdminApi::new());
        let body = json!({"username": "demo", "password": "nope"});
        let response = build_router(state.clone())
            .oneshot(
                Request::post("/api/openstack/auth")
                    .header("content-type", "application/json")
                    .header("cookie", "session_id=s1")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(messages(&state, "s1"), vec!["Invalid credentials"]);
    }

    #[tokio::test]
    async fn listing_users_announces_success() {
        let mut keycloak = MockKeycloakAdminApi::new();
        keycloak.expect_list_users().returning(|_| Ok(vec![]));
        let state = state(MockOpenStackApi::new(), keycloak);
        let response = build_router(state.clone())
            .oneshot(
                Request::get("/api/users")
                    .header("authorization", "Bearer admin")
                    .header("cookie", "session_id=s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(messages(&state, "s1"), vec!["Users fetched successfully"]);
    }

    #[tokio::test]
    async fn partial_user_update_keeps_other_fields() {
        let mut keycloak = MockKeycloakAdminApi::new();
        keycloak.expect_list_users().returning(|_| {
            Ok(vec![KeycloakUser {
                id: Some("u1".into()),
                username: "alice".into(),
                email: Some("old@example.org".into()),
                first_name: Some("Alice".into()),
                enabled: true,
                email_verified: true,
                ..Default::default()
            }])
        });
        keycloak
            .expect_update_user()
            .times(1)
            .withf(|_, id, user| {
                id == "u1"
                    && user.enabled
                    && user.email_verified
                    && user.username == "alice"
                    && user.first_name.as_deref() == Some("Alice")
                    && user.email.as_deref() == Some("new@example.org")
            })
            .returning(|_, _, _| Ok(()));
        let body = json!({"email": "new@example.org"});
        let response = app(MockOpenStackApi::new(), keycloak)
            .oneshot(
                Request::put("/api/users/u1")
                    .header("authorization", "Bearer admin")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_forgets_the_console_session() {
        let state = state(MockOpenStackApi::new(), MockKeycloakAdminApi::new());
        state.session("s1");
        state.notifications.push("s1", crate::models::Notification::success("queued"));
        let response = build_router(state.clone())
            .oneshot(
                Request::post("/api/openstack/logout")
                    .header("cookie", "session_id=s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.session_count(), 0);
        assert!(messages(&state, "s1").is_empty());
    }

    #[tokio::test]
    async fn discarding_the_wizard_drops_the_session() {
        let state = state(MockOpenStackApi::new(), MockKeycloakAdminApi::new());
        state.session("s1");
        let response = build_router(state.clone())
            .oneshot(
                Request::delete("/api/wizard")
                    .header("cookie", "session_id=s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.session_count(), 0);
    }
}
