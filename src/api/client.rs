use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use yansi::Paint;

use crate::error::ApiError;
use crate::utils::mask_secret;

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        println!("{}", msg);
    }
}

const SENSITIVE_HEADERS: &[&str] = &["x-auth-token", "authorization"];
const SENSITIVE_FIELDS: &[&str] = &["password", "client_secret", "access_token", "refresh_token", "id_token"];

/// Request body variants used by OpenStack (JSON) and Keycloak's token
/// endpoint (form).
pub enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Form(&'a [(&'a str, &'a str)]),
}

/// A 2xx upstream response. The body is `Value::Null` when the upstream sent
/// nothing (201/204 from Keycloak).
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn masked_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if SENSITIVE_FIELDS.contains(&k.as_str()) && v.is_string() {
                        (k.clone(), Value::String("****".into()))
                    } else {
                        (k.clone(), masked_json(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(masked_json).collect()),
        other => other.clone(),
    }
}

/// Pretty, masked rendering of a parsed response body for the echo.
fn response_echo(body: &Value) -> String {
    if body.is_null() {
        return "(empty)".to_string();
    }
    serde_json::to_string_pretty(&masked_json(body)).unwrap_or_default()
}

fn log_request(method: &Method, url: &str, headers: &[(&str, &str)], payload: &Payload<'_>) {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
    parts.push(format!("-X {}", Paint::new(method.as_str()).fg(yansi::Color::Yellow).bold()));
    parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));

    for (name, value) in headers {
        let shown = if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
            mask_secret(value)
        } else {
            value.to_string()
        };
        parts.push(format!(
            "{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new(format!("'{}: {}'", name, shown)).fg(yansi::Color::Magenta)
        ));
    }

    match payload {
        Payload::Empty => {}
        Payload::Json(body) => {
            parts.push(format!(
                "{} {}",
                Paint::new("-H").fg(yansi::Color::Magenta),
                Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta)
            ));
            let json_str = serde_json::to_string_pretty(&masked_json(body)).unwrap_or_default();
            let escaped_json = json_str.replace('\'', "'\\''");
            parts.push(format!(
                "{} {}",
                Paint::new("-d").fg(yansi::Color::Blue),
                Paint::new(format!("'{}'", escaped_json)).fg(yansi::Color::White)
            ));
        }
        Payload::Form(fields) => {
            for (k, v) in fields.iter() {
                let shown = if SENSITIVE_FIELDS.contains(k) { "****" } else { *v };
                parts.push(format!(
                    "{} {}",
                    Paint::new("--data-urlencode").fg(yansi::Color::Blue),
                    Paint::new(format!("'{}={}'", k, shown)).fg(yansi::Color::White)
                ));
            }
        }
    }
    log_output(format!("Request:\n{}", parts.join(" ")));
}

/// Core HTTP call shared by the OpenStack and Keycloak gateways.
///
/// One attempt only; the caller decides whether a failure is worth retrying.
/// Non-2xx statuses are translated with [`ApiError::from_status`], transport
/// failures become [`ApiError::UpstreamUnavailable`].
pub async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    headers: &[(&str, &str)],
    payload: Payload<'_>,
) -> Result<UpstreamResponse, ApiError> {
    log_request(&method, url, headers, &payload);

    let mut req = client.request(method.clone(), url);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    req = match payload {
        Payload::Empty => req,
        Payload::Json(body) => req.json(body),
        Payload::Form(fields) => req.form(fields),
    };

    let resp = req.send().await.map_err(|e| {
        tracing::warn!(%e, %method, url, "Upstream request failed");
        ApiError::UpstreamUnavailable(format!("Request failed: {}", e))
    })?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let text = resp
        .text()
        .await
        .map_err(|e| ApiError::UpstreamUnavailable(format!("Failed to read response: {}", e)))?;

    if !(200..300).contains(&status) {
        log_output(format!(
            "Response:\n{}",
            Paint::new(format!("HTTP {}: {}", status, text)).fg(yansi::Color::Red)
        ));
        tracing::info!(status, %method, url, "Upstream returned an error status");
        return Err(ApiError::from_status(status, &text));
    }

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))?
    };

    // Grayed out color (dimmed/dark gray)
    log_output(format!("Response:\n{}", Paint::new(response_echo(&body)).rgb(100, 100, 100)));

    Ok(UpstreamResponse {
        status,
        headers,
        body,
    })
}
