//! Persistence service client error types.

/// Errors from persistence service calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport error (connection failure, timeout, TLS).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// Authentication was rejected (401/403) — the credential is
    /// missing, expired, or lacks group membership.
    #[error("authentication rejected by {endpoint}: {message}")]
    Auth { endpoint: String, message: String },
    /// The resource does not exist (404).
    #[error("{endpoint}: not found")]
    NotFound { endpoint: String },
    /// The service returned any other non-2xx status.
    #[error("persistence service {endpoint} returned {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// Response body did not match the expected envelope.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// Client-side configuration error.
    #[error("store configuration error: {reason}")]
    InvalidConfig { reason: String },
}

impl StoreError {
    /// Whether the error is an authentication failure the caller should
    /// treat by clearing the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Whether the error is a plain 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
