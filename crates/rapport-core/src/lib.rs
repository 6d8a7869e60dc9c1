//! # rapport-core — Report Domain Types
//!
//! Foundational types for the report drafting & submission engine:
//!
//! - **Identifiers** ([`identity`]): UUID-backed newtypes. A
//!   [`SectionId`] is not a [`ReportId`]; mixing them up is a compile
//!   error, not a production incident.
//!
//! - **Data model** ([`report`]): [`Report`], ordered [`Section`]s,
//!   creation payloads, and the partial-update patches the autosave
//!   scheduler accumulates between commits.
//!
//! - **Status machine** ([`status`]): the `draft → submitted → reviewed
//!   → published` lifecycle as a pure reducer. `draft` is the only
//!   mutable state; this crate is where that rule lives.
//!
//! - **Submission validator** ([`validation`]): the pure predicate
//!   guarding the submit transition: no empty reports, no blank
//!   sections.
//!
//! Everything here is synchronous, I/O-free, and independently
//! testable. The scheduler, reconciliation, and persistence client live
//! in `rapport-engine` and `rapport-client`.

pub mod identity;
pub mod report;
pub mod status;
pub mod validation;

// Re-export primary types.
pub use identity::{GroupId, ProjectId, ReportId, SectionId};
pub use report::{
    append_order, sort_sections, ContentKind, NewReport, NewSection, Report, ReportPatch, Section,
    SectionPatch,
};
pub use status::{transition, ReportStatus, StatusError, StatusEvent};
pub use validation::{validate_for_submission, word_count, ValidationError};
