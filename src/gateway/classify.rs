use serde_json::Value;

use crate::error::ApiError;

const LOGIN_PATH: &str = "/auth/login";

/// Map a non-2xx response to the error taxonomy. Order matters: 401 is split
/// on the endpoint before any other status is considered.
pub fn classify_status(status: u16, path: &str, payload: Option<&Value>) -> ApiError {
    let server_message = payload
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty());

    match status {
        401 if is_login_endpoint(path) => {
            ApiError::invalid_credentials(normalize_login_message(server_message))
        }
        401 => ApiError::session_expired(),
        400 => ApiError::validation(server_message.unwrap_or("Invalid request")).with_status(400),
        403 => ApiError::forbidden(server_message.unwrap_or("Access forbidden")).with_status(403),
        404 => ApiError::not_found(server_message.unwrap_or("Resource not found")).with_status(404),
        s if s >= 500 => {
            // Raw detail goes to the log only
            if let Some(detail) = server_message {
                tracing::error!(status = s, "Server error on {}: {}", path, detail);
            }
            ApiError::server().with_status(s)
        }
        s => {
            let message = server_message
                .map(str::to_string)
                .unwrap_or_else(|| format!("Server error: {}", s));
            ApiError::unknown(message).with_status(s)
        }
    }
}

/// Map a transport failure (no response received)
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_builder() {
        tracing::error!("Failed to build request: {}", err);
        return ApiError::unknown("Request failed");
    }
    tracing::warn!(timeout = err.is_timeout(), "Network error: {}", err);
    ApiError::network()
}

pub fn is_login_endpoint(path: &str) -> bool {
    path.starts_with(LOGIN_PATH)
}

/// Compatibility shim for the backend's login messages.
///
/// Rewrites by substring match only; do not extend with new patterns.
pub fn normalize_login_message(server_message: Option<&str>) -> String {
    let Some(message) = server_message else {
        return "Invalid email or password".to_string();
    };

    let lower = message.to_lowercase();
    if lower.contains("user not found")
        || lower.contains("user does not exist")
        || lower.contains("no user found")
    {
        "User does not exist".to_string()
    } else if lower.contains("password") || lower.contains("credential") {
        "Invalid email or password".to_string()
    } else {
        message.to_string()
    }
}
