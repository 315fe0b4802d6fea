// Client-side API error taxonomy
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NETWORK_MESSAGE: &str = "Unable to connect to server. Please check your internet connection.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Classification of every failed backend interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // No response received (connect failure, timeout)
    Network,

    // 401 on the login endpoint
    InvalidCredentials,

    // 401 anywhere else; handled globally, never surfaced as a normal error
    SessionExpired,

    // 400, and client-side rejections that never reach the network
    Validation,

    // 403
    Forbidden,

    // 404
    NotFound,

    // >= 500
    Server,

    Unknown,
}

/// Error value constructed once at the gateway boundary.
///
/// Downstream code matches on [`ApiError::kind`] and never re-inspects
/// transport details.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status that produced this error, if a response was received
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// True for the forced sign-out marker; callers treat it as a cancelled outcome
    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::SessionExpired
    }

    /// Network failures can be retried by an explicit user action
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Server)
    }

    /// Get error code for display and JSON output
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::SessionExpired => "SESSION_EXPIRED",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn network() -> Self {
        ApiError::new(ErrorKind::Network, NETWORK_MESSAGE)
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::InvalidCredentials, message).with_status(401)
    }

    pub fn session_expired() -> Self {
        ApiError::new(ErrorKind::SessionExpired, SESSION_EXPIRED_MESSAGE).with_status(401)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Validation, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::NotFound, message)
    }

    pub fn server() -> Self {
        ApiError::new(ErrorKind::Server, SERVER_MESSAGE)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Unknown, message)
    }
}
