//! # Response Envelope
//!
//! The persistence service wraps every successful JSON response in
//! `{"data": T}` and every failure in `{"message": string}` alongside a
//! non-2xx status. These types decode both shapes; status-based routing
//! between them lives in the HTTP client.

use serde::{Deserialize, Serialize};

/// Successful response envelope: `{"data": T}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// The payload.
    pub data: T,
}

/// Failure response envelope: `{"message": string}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureBody {
    /// Human-readable failure description from the service.
    pub message: String,
}

/// Extract the failure message from a non-2xx response body.
///
/// Falls back to the raw body (trimmed) when it is not a failure
/// envelope, and to a placeholder when the body is empty — the HTTP
/// status still identifies the failure class either way.
pub fn failure_message(body: &[u8]) -> String {
    if let Ok(failure) = serde_json::from_slice::<FailureBody>(body) {
        return failure.message;
    }
    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        "(no response body)".to_string()
    } else {
        raw.to_string()
    }
}
