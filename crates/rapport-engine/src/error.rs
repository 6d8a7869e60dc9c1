//! Engine error taxonomy.
//!
//! Validation and lifecycle-guard errors are produced synchronously,
//! before any network call, so the caller can react without a round
//! trip. Store errors surface only after a commit was actually sent;
//! by then the optimistic local state has already been applied and is
//! retained.

use thiserror::Error;

use rapport_client::StoreError;
use rapport_core::{ReportStatus, SectionId, ValidationError};

/// Errors returned by [`ReportSession`](crate::session::ReportSession)
/// commands.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Submission blocked by the local validator. No network call made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A mutation was attempted while the report is no longer in
    /// draft. Rejected before any network call.
    #[error("cannot {operation}: report is {status}, not draft")]
    Conflict {
        /// The report's current status.
        status: ReportStatus,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Credential missing, expired, or lacking group membership. The
    /// caller should clear the session and redirect to sign-in.
    #[error("authentication failed: {message}")]
    Auth {
        /// Failure description from the service.
        message: String,
    },

    /// The command needs a report but none exists for this group yet.
    /// (The no-report state itself is normal; only commands that
    /// require one produce this.)
    #[error("no report exists for this group yet")]
    NoReport,

    /// A section id that the aggregate does not hold.
    #[error("unknown section {id}")]
    UnknownSection {
        /// The offending identifier.
        id: SectionId,
    },

    /// A commit exceeded the configured timeout. Local content is
    /// retained; the save status shows the error.
    #[error("commit timed out after {elapsed_ms}ms")]
    Timeout {
        /// The configured bound, in milliseconds.
        elapsed_ms: u64,
    },

    /// The persistence service rejected or failed a call that was
    /// actually sent. Local optimistic content is retained.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Auth { message, .. } => Self::Auth { message },
            other => Self::Store(other),
        }
    }
}
