//! Request guards for the two kinds of upstream credentials the console
//! forwards.
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::compute::AUTH_TOKEN_HEADER;
use crate::error::ApiError;
use crate::models::AuthToken;

/// OpenStack token taken from the `X-Auth-Token` header. Missing or blank
/// headers are rejected before any upstream call.
pub struct XAuthToken(pub AuthToken);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for XAuthToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        AuthToken::parse(raw).map(XAuthToken)
    }
}

/// Keycloak admin token from `Authorization: Bearer ...`.
pub struct AdminBearer(pub AuthToken);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminBearer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let token = match raw.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
            _ => return Err(ApiError::Unauthorized),
        };
        AuthToken::parse(token).map(AdminBearer)
    }
}
