//! Classification of failed remote responses into actionable errors

use crate::error::EngineError;

use serde_json::Value;

pub const ROUTE_NOT_FOUND_CODE: &str = "ROUTE_NOT_FOUND_ERROR";
pub const INSUFFICIENT_LIQUIDITY_CODE: &str = "INSUFFICIENT_LIQUIDITY";

/// Turn a failed response into an error.
///
/// Known error codes take precedence over the HTTP status.
pub fn classify_failure(status: u16, body: &Value) -> EngineError {
    let (code, message) = extract_error(body);

    match code.as_deref() {
        Some(ROUTE_NOT_FOUND_CODE) => {
            return EngineError::RouteNotFound(
                "Bridge route not available for this token pair. Consider bridging through an \
                 intermediate token such as ETH or USDC"
                    .to_string(),
            )
        }
        Some(INSUFFICIENT_LIQUIDITY_CODE) => {
            return EngineError::RemoteApi {
                status,
                message: "Insufficient liquidity for this bridge. Reduce the amount or retry later"
                    .to_string(),
            }
        }
        _ => {}
    }

    let message = match status {
        429 => "Rate limited by the bridge network. Please retry later".to_string(),
        401 => "Authentication with the bridge network failed. Check the API key".to_string(),
        503 => "Bridge service unavailable. Please retry later".to_string(),
        _ => message.unwrap_or_else(|| format!("Request failed with status {}", status)),
    };

    EngineError::RemoteApi { status, message }
}

/// Whether a body reports an error even though the status was 2xx
pub fn carries_error(body: &Value) -> bool {
    let error = body.get("error").is_some_and(|e| !e.is_null());
    let errors = body
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|e| !e.is_empty());
    error || errors
}

/// Pull `(code, message)` out of the error shapes the remote network uses:
/// `{"error": "CODE"}`, `{"error": {"code", "message"}}` and
/// `{"errors": [{"code", "message"}]}`.
fn extract_error(body: &Value) -> (Option<String>, Option<String>) {
    let as_string = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    match body.get("error") {
        Some(Value::String(text)) => {
            return (Some(text.clone()), as_string(body.get("message")).or(Some(text.clone())))
        }
        Some(detail) if detail.is_object() => {
            return (as_string(detail.get("code")), as_string(detail.get("message")))
        }
        _ => {}
    }

    if let Some(first) = body.get("errors").and_then(Value::as_array).and_then(|e| e.first()) {
        return (as_string(first.get("code")), as_string(first.get("message")));
    }

    match body {
        Value::String(text) if !text.trim().is_empty() => (None, Some(text.clone())),
        _ => (None, as_string(body.get("message"))),
    }
}
