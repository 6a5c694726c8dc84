//! Error taxonomy shared across the client stores.

use thiserror::Error;

/// Error returned by the auth and config API seams.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Malformed input rejected before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Non-2xx response or network failure from a backend client.
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// The backend rejected the refresh token.
    #[error("Session expired")]
    SessionExpired,
}

impl ApiError {
    /// True if this error means the session can no longer be refreshed.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Error from a session vault backend.
///
/// Only `save`/`clear` surface these; `load` is fail-soft and maps any
/// decode or I/O problem to "no stored session".
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
