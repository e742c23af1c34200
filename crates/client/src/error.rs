//! Failure taxonomy for calls made through the gateway.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error body shape produced by the service.
///
/// All fields are optional on the wire; display-message extraction tries
/// `error`, then `msg`, then the field details, in that order.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub msg: Option<String>,
    pub details: Option<BTreeMap<String, String>>,
}

impl ErrorBody {
    /// Best-effort decode. A body that is not the documented error shape
    /// yields the empty `ErrorBody`; the status line still carries meaning.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The user-displayable message, by precedence.
    pub fn message(&self) -> Option<String> {
        if let Some(error) = self.error.as_deref().filter(|s| !s.is_empty()) {
            return Some(error.to_string());
        }
        if let Some(msg) = self.msg.as_deref().filter(|s| !s.is_empty()) {
            return Some(msg.to_string());
        }
        self.details.as_ref().and_then(|details| {
            details
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .next()
        })
    }
}

/// Errors surfaced to callers of the gateway.
#[derive(Debug, Error)]
pub enum Error {
    /// The service rejected the credential (401). The credential store has
    /// already been cleared by the time the caller sees this.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The service rejected the request content (other 4xx). `details` maps
    /// field names to messages when the service provides them.
    #[error("request rejected: {message}")]
    Validation {
        message: String,
        details: BTreeMap<String, String>,
    },

    /// 5xx, or a 2xx body that does not match the documented response shape.
    #[error("server failure: {0}")]
    Server(String),

    /// Timeout or no response at all. Distinct from an authorization failure
    /// so callers can message it generically.
    #[error("network failure: {0}")]
    Network(String),

    /// Invalid client-side configuration (unparseable base URL and the like).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "authorization_failure",
            Self::Validation { .. } => "validation_failure",
            Self::Server(_) => "server_failure",
            Self::Network(_) => "network_failure",
            Self::Config(_) => "config_error",
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
