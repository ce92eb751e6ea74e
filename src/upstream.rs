//! Helpers shared by the upstream HTTP clients.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Build a reqwest client with the gateway user agent and an optional timeout.
pub(crate) fn build_http_client(
    user_agent: &str,
    timeout_secs: Option<u64>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

/// Join a normalized base URL and a relative path.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Pull the human-readable message out of an upstream error body.
///
/// `pointer` is a JSON pointer (e.g. `/detail`, `/error/message`). Falls back to the raw body,
/// then to the canonical reason for `status`.
pub(crate) fn extract_error_message(status: StatusCode, body: &str, pointer: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.pointer(pointer) {
            Some(Value::String(message)) if !message.is_empty() => return message.clone(),
            Some(Value::String(_) | Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

/// Read a failed response into its status and extracted message.
pub(crate) async fn read_failure(
    response: reqwest::Response,
    pointer: &str,
) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, extract_error_message(status, &body, pointer))
}
