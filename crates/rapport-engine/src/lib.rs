//! # rapport-engine — Report Drafting & Submission Engine
//!
//! The coordination core of the report platform:
//!
//! - **Session** ([`session`]): [`ReportSession`] owns one group's
//!   report-editing session end to end: optimistic edits, the guarded
//!   submit transition, and every call to the persistence store.
//!
//! - **Autosave scheduler** ([`scheduler`]): debounces rapid edits
//!   into a minimal number of durable commits. One quiescence window,
//!   one save-status indicator, and a per-commit generation counter
//!   that discards stale out-of-order completions.
//!
//! - **Aggregate** ([`aggregate`]): the in-memory report + ordered
//!   sections, with reconciliation of server-confirmed entities and
//!   derived progress stats.
//!
//! - **Errors** ([`error`]): [`EngineError`]. Validation and
//!   lifecycle guards fail before any network call; store failures
//!   retain local content.
//!
//! ## Guarantees
//!
//! 1. Edits to one section within a quiescence window coalesce into a
//!    single commit carrying the latest merged patch.
//! 2. `save_now()` resolved ⇒ no pending timer, no in-flight commit,
//!    all prior edits durable (or the error says why not).
//! 3. `submit()` flushes, then validates, then transitions; it never
//!    races an autosave commit, and a report that leaves draft rejects
//!    every further mutation before the network.

pub mod aggregate;
pub mod error;
pub mod scheduler;
pub mod session;

// Re-export primary types.
pub use aggregate::{ReportAggregate, ReportStats};
pub use error::EngineError;
pub use scheduler::{AutosaveConfig, SaveMode, SaveStatus};
pub use session::{ReportSession, SectionDraft};
