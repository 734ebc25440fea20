//! Error taxonomy shared by the gateways, the wizard and the HTTP layer.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// A single form field that failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by every operation of the console.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable token was supplied by the caller
    #[error("Missing or empty auth token")]
    Unauthorized,

    /// Transport failure or 5xx from OpenStack/Keycloak
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Credentials or subject token refused
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-2xx upstream status
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Upstream answered 2xx with a body we could not understand
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Validation failed: {}", describe_fields(.0))]
    ValidationFailed(Vec<FieldError>),

    /// A Keycloak create/update/delete did not go through
    #[error("Failed to {action} user: {source}")]
    MutationFailed {
        action: &'static str,
        source: Box<ApiError>,
    },

    /// The wizard is not in a step that accepts the requested operation
    #[error("Step conflict: {0}")]
    StepConflict(String),
}

impl ApiError {
    /// Translate a non-2xx upstream status into a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => ApiError::AuthRejected(message),
            404 => ApiError::NotFound(message),
            500..=599 => ApiError::UpstreamUnavailable(format!("HTTP {}: {}", status, message)),
            _ => ApiError::Upstream { status, message },
        }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::ValidationFailed(vec![FieldError::new(field, message)])
    }

    pub fn mutation(action: &'static str, source: ApiError) -> Self {
        ApiError::MutationFailed {
            action,
            source: Box::new(source),
        }
    }

    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::UpstreamUnavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::AuthRejected(_) => "auth_rejected",
            ApiError::NotFound(_) => "not_found",
            ApiError::Upstream { .. } => "upstream_error",
            ApiError::InvalidResponse(_) => "invalid_response",
            ApiError::ValidationFailed(_) => "validation_failed",
            ApiError::MutationFailed { .. } => "mutation_failed",
            ApiError::StepConflict(_) => "step_conflict",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::AuthRejected(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) | ApiError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MutationFailed { source, .. } => source.status_code(),
            ApiError::StepConflict(_) => StatusCode::CONFLICT,
        }
    }
}

/// Keystone, Nova and Keycloak all wrap their messages differently; pull out
/// the human readable part when we can find one.
fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let candidates = [
            value.pointer("/error/message"),
            value.pointer("/errorMessage"),
            value.pointer("/error_description"),
            value.pointer("/message"),
            value.as_object().and_then(|o| o.values().next()).and_then(|v| v.get("message")),
            value.pointer("/error"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(s) = candidate.as_str() {
                return s.to_string();
            }
        }
    }
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }
        let fields = match &self {
            ApiError::ValidationFailed(fields) => Some(fields.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            status: status.as_u16(),
            error: self.kind(),
            message: self.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}
