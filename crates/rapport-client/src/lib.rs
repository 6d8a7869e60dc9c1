//! # rapport-client — Persistence Service Client
//!
//! Typed client for the report persistence API the drafting engine
//! consumes.
//!
//! - **Contract** ([`store`]): the object-safe async [`ReportStore`]
//!   trait, the [`ReportDocument`] fetch shape, and the in-memory
//!   [`RecordingReportStore`] test double.
//!
//! - **HTTP implementation** ([`http`]): [`HttpReportStore`] over
//!   `reqwest` with bearer auth, per-request timeout, and envelope
//!   decoding.
//!
//! - **Envelope** ([`envelope`]): the `{"data": T}` / `{"message"}`
//!   wire wrapper.
//!
//! - **Errors** ([`error`]): [`StoreError`] with endpoint and status
//!   context on every variant.
//!
//! The engine never sees raw `reqwest` types: everything crosses this
//! crate's boundary as domain types from `rapport-core` or as a
//! [`StoreError`].

pub mod envelope;
pub mod error;
pub mod http;
mod retry;
pub mod store;

// Re-export primary types.
pub use error::StoreError;
pub use http::{HttpReportStore, StoreConfig};
pub use store::{RecordingReportStore, ReportDocument, ReportStore, StoreCall};
