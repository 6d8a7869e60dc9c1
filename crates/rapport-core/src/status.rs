//! # Report Status State Machine
//!
//! The report lifecycle is a strictly linear progression:
//!
//! ```text
//! Draft → Submitted → Reviewed → Published
//! ```
//!
//! `Draft` is the only state in which report content and sections are
//! mutable. `Submitted → Reviewed → Published` are driven by teacher
//! actions in the review layer; the drafting engine only ever performs
//! the `Draft → Submitted` transition, and it does so through a guarded
//! command (see `rapport-engine`), never by writing the field directly.
//!
//! Transitions live in a pure reducer, [`transition`], so the lifecycle
//! is unit-testable with no scheduler, network, or rendering layer
//! attached. No wildcard match arms are used — adding a new status or
//! event forces a compile error here rather than silently falling
//! through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Being drafted by the group. The only mutable state.
    Draft,
    /// Handed in; awaiting teacher review.
    Submitted,
    /// Reviewed by a teacher, not yet published.
    Reviewed,
    /// Published. Terminal state.
    Published,
}

impl ReportStatus {
    /// Whether report content and sections may be mutated in this state.
    pub fn is_mutable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// The canonical wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle events that can be applied to a report status.
///
/// Only [`StatusEvent::Submit`] originates in this engine; `Review` and
/// `Publish` are included so the reducer covers the full lifecycle and
/// reconciliation can sanity-check server-reported statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The group hands the report in.
    Submit,
    /// A teacher completes review.
    Review,
    /// A teacher publishes the reviewed report.
    Publish,
}

impl StatusEvent {
    /// The canonical name of this event, used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Review => "review",
            Self::Publish => "publish",
        }
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from the status reducer.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The event is not applicable in the current state.
    #[error("cannot {event} a report in status {status}")]
    InvalidTransition {
        /// The status the report was in.
        status: ReportStatus,
        /// The event that was rejected.
        event: StatusEvent,
    },
}

/// Pure reducer: apply a lifecycle event to a status, yielding the next
/// status or a rejection. Performs no I/O and mutates nothing.
pub fn transition(status: ReportStatus, event: StatusEvent) -> Result<ReportStatus, StatusError> {
    let next = match event {
        StatusEvent::Submit => match status {
            ReportStatus::Draft => Some(ReportStatus::Submitted),
            ReportStatus::Submitted | ReportStatus::Reviewed | ReportStatus::Published => None,
        },
        StatusEvent::Review => match status {
            ReportStatus::Submitted => Some(ReportStatus::Reviewed),
            ReportStatus::Draft | ReportStatus::Reviewed | ReportStatus::Published => None,
        },
        StatusEvent::Publish => match status {
            ReportStatus::Reviewed => Some(ReportStatus::Published),
            ReportStatus::Draft | ReportStatus::Submitted | ReportStatus::Published => None,
        },
    };

    next.ok_or(StatusError::InvalidTransition { status, event })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_is_the_only_mutable_status() {
        assert!(ReportStatus::Draft.is_mutable());
        assert!(!ReportStatus::Submitted.is_mutable());
        assert!(!ReportStatus::Reviewed.is_mutable());
        assert!(!ReportStatus::Published.is_mutable());
    }

    #[test]
    fn published_is_the_only_terminal_status() {
        assert!(!ReportStatus::Draft.is_terminal());
        assert!(!ReportStatus::Submitted.is_terminal());
        assert!(!ReportStatus::Reviewed.is_terminal());
        assert!(ReportStatus::Published.is_terminal());
    }

    #[test]
    fn happy_path_walks_the_full_lifecycle() {
        let submitted = transition(ReportStatus::Draft, StatusEvent::Submit).unwrap();
        assert_eq!(submitted, ReportStatus::Submitted);

        let reviewed = transition(submitted, StatusEvent::Review).unwrap();
        assert_eq!(reviewed, ReportStatus::Reviewed);

        let published = transition(reviewed, StatusEvent::Publish).unwrap();
        assert_eq!(published, ReportStatus::Published);
        assert!(published.is_terminal());
    }

    #[test]
    fn submit_is_rejected_outside_draft() {
        for status in [
            ReportStatus::Submitted,
            ReportStatus::Reviewed,
            ReportStatus::Published,
        ] {
            let err = transition(status, StatusEvent::Submit).unwrap_err();
            assert!(matches!(err, StatusError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn review_requires_submitted() {
        assert!(transition(ReportStatus::Draft, StatusEvent::Review).is_err());
        assert!(transition(ReportStatus::Published, StatusEvent::Review).is_err());
    }

    #[test]
    fn publish_requires_reviewed() {
        assert!(transition(ReportStatus::Draft, StatusEvent::Publish).is_err());
        assert!(transition(ReportStatus::Submitted, StatusEvent::Publish).is_err());
        assert!(transition(ReportStatus::Published, StatusEvent::Publish).is_err());
    }

    #[test]
    fn no_event_leaves_a_terminal_status() {
        for event in [StatusEvent::Submit, StatusEvent::Review, StatusEvent::Publish] {
            assert!(transition(ReportStatus::Published, event).is_err());
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(ReportStatus::Draft.as_str(), "draft");
        assert_eq!(ReportStatus::Submitted.as_str(), "submitted");
        assert_eq!(ReportStatus::Reviewed.as_str(), "reviewed");
        assert_eq!(ReportStatus::Published.as_str(), "published");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ReportStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
        let back: ReportStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(back, ReportStatus::Draft);
    }

    #[test]
    fn invalid_transition_error_names_both_sides() {
        let err = transition(ReportStatus::Submitted, StatusEvent::Submit).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("submit"));
        assert!(msg.contains("submitted"));
    }
}
