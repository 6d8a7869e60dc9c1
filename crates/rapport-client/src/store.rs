//! # Persistence Contract
//!
//! Defines the [`ReportStore`] trait — the persistence surface the
//! drafting engine consumes — and an in-memory [`RecordingReportStore`]
//! for tests.
//!
//! ## Architecture
//!
//! Production wires the engine to [`HttpReportStore`](crate::http::HttpReportStore);
//! tests use [`RecordingReportStore`], which implements the same
//! draft-only mutation rules the real service enforces server-side and
//! records every call so tests can assert commit counts ("exactly one
//! commit within the window") and absence ("no network call was made").
//! Implementations must be `Send + Sync` so the engine can share them
//! across async tasks behind an `Arc`; the trait is object-safe.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use rapport_core::{
    GroupId, NewReport, NewSection, ProjectId, Report, ReportId, ReportPatch, ReportStatus,
    Section, SectionId, SectionPatch,
};

use crate::error::StoreError;

/// A report together with its sections, as returned by `fetch_report`.
///
/// The service embeds the ordered section list in the report payload;
/// `#[serde(flatten)]` keeps the wire shape flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    /// The report itself.
    #[serde(flatten)]
    pub report: Report,
    /// Sections of the report. May arrive unsorted; the engine sorts
    /// by order index on load.
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// The persistence surface consumed by the drafting engine.
///
/// Mutating operations are rejected by the service when the owning
/// report is not in draft; the engine additionally guards client-side
/// so no doomed call is issued in the first place.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetch the report (with sections) for a (project, group) pair.
    /// Returns `Ok(None)` when none exists yet — a normal state, not an
    /// error.
    async fn fetch_report(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
    ) -> Result<Option<ReportDocument>, StoreError>;

    /// Create the report for a (project, group) pair. The service
    /// rejects a second report for the same pair.
    async fn create_report(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
        payload: &NewReport,
    ) -> Result<Report, StoreError>;

    /// Update report content fields. Rejected when not in draft.
    async fn update_report(
        &self,
        report_id: ReportId,
        patch: &ReportPatch,
    ) -> Result<Report, StoreError>;

    /// Create a section. Rejected when the report is not in draft.
    async fn create_section(
        &self,
        report_id: ReportId,
        payload: &NewSection,
    ) -> Result<Section, StoreError>;

    /// Update a section. Rejected when the owning report is not in
    /// draft. The returned section carries the server-derived canonical
    /// update timestamp.
    async fn update_section(
        &self,
        section_id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, StoreError>;

    /// Delete a section. Rejected when the owning report is not in
    /// draft. Surviving order values are NOT renumbered.
    async fn delete_section(&self, section_id: SectionId) -> Result<(), StoreError>;

    /// Submit the report: sets status to submitted and stamps
    /// `submitted_at`.
    async fn submit_report(&self, report_id: ReportId) -> Result<Report, StoreError>;
}

// ─── Recording In-Memory Store ──────────────────────────────────────────

/// One recorded call against the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FetchReport,
    CreateReport,
    UpdateReport(ReportId),
    CreateSection(ReportId),
    UpdateSection(SectionId),
    DeleteSection(SectionId),
    SubmitReport(ReportId),
}

#[derive(Default)]
struct StoreState {
    report: Option<Report>,
    sections: Vec<Section>,
    calls: Vec<StoreCall>,
    /// When set, the next call fails with this message (consumed once).
    fail_next: Option<String>,
    /// Artificial latency for the next section update (consumed once),
    /// for racing a slow commit against a newer one in tests.
    delay_next_section_update: Option<Duration>,
}

/// In-memory [`ReportStore`] that records every call.
///
/// Mirrors the service's own rules: one report per store, draft-only
/// mutation, server-derived timestamps. Failures and latency are
/// scriptable per test.
#[derive(Default)]
pub struct RecordingReportStore {
    state: Mutex<StoreState>,
}

impl RecordingReportStore {
    /// Create an empty store (no report yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a report and its sections.
    pub fn with_report(report: Report, sections: Vec<Section>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                report: Some(report),
                sections,
                ..StoreState::default()
            }),
        }
    }

    /// All calls observed so far, in arrival order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Number of `UpdateSection` calls observed so far.
    pub fn section_update_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::UpdateSection(_)))
            .count()
    }

    /// Make the next call fail with an Api error carrying `message`.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Delay the next section update by `delay` before responding
    /// (consumed once).
    pub fn delay_next_section_update(&self, delay: Duration) {
        self.state.lock().delay_next_section_update = Some(delay);
    }

    /// Current server-side section snapshot (test inspection).
    pub fn sections_snapshot(&self) -> Vec<Section> {
        self.state.lock().sections.clone()
    }

    /// Current server-side report snapshot (test inspection).
    pub fn report_snapshot(&self) -> Option<Report> {
        self.state.lock().report.clone()
    }

    fn take_scripted_failure(state: &mut StoreState, endpoint: &str) -> Result<(), StoreError> {
        if let Some(message) = state.fail_next.take() {
            return Err(StoreError::Api {
                endpoint: endpoint.to_string(),
                status: 500,
                message,
            });
        }
        Ok(())
    }

    fn require_draft(report: &Report, endpoint: &str) -> Result<(), StoreError> {
        if report.status.is_mutable() {
            Ok(())
        } else {
            Err(StoreError::Api {
                endpoint: endpoint.to_string(),
                status: 409,
                message: format!("report is not in draft (status: {})", report.status),
            })
        }
    }
}

#[async_trait]
impl ReportStore for RecordingReportStore {
    async fn fetch_report(
        &self,
        _project_id: ProjectId,
        _group_id: GroupId,
    ) -> Result<Option<ReportDocument>, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::FetchReport);
        Self::take_scripted_failure(&mut state, "fetch_report")?;
        Ok(state.report.clone().map(|report| ReportDocument {
            report,
            sections: state.sections.clone(),
        }))
    }

    async fn create_report(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
        payload: &NewReport,
    ) -> Result<Report, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::CreateReport);
        Self::take_scripted_failure(&mut state, "create_report")?;
        if state.report.is_some() {
            return Err(StoreError::Api {
                endpoint: "create_report".to_string(),
                status: 409,
                message: "a report already exists for this group".to_string(),
            });
        }
        let now = Utc::now();
        let report = Report {
            id: ReportId::new(),
            project_id,
            group_id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            status: ReportStatus::Draft,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.report = Some(report.clone());
        Ok(report)
    }

    async fn update_report(
        &self,
        report_id: ReportId,
        patch: &ReportPatch,
    ) -> Result<Report, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::UpdateReport(report_id));
        Self::take_scripted_failure(&mut state, "update_report")?;
        let report = state.report.as_mut().ok_or(StoreError::NotFound {
            endpoint: "update_report".to_string(),
        })?;
        Self::require_draft(report, "update_report")?;
        patch.apply_to(report);
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn create_section(
        &self,
        report_id: ReportId,
        payload: &NewSection,
    ) -> Result<Section, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::CreateSection(report_id));
        Self::take_scripted_failure(&mut state, "create_section")?;
        let report = state.report.as_ref().ok_or(StoreError::NotFound {
            endpoint: "create_section".to_string(),
        })?;
        Self::require_draft(report, "create_section")?;
        let section = Section {
            id: SectionId::new(),
            report_id,
            title: payload.title.clone(),
            content: payload.content.clone().unwrap_or_default(),
            content_type: payload.content_type.unwrap_or_default(),
            order: payload.order,
            updated_at: Utc::now(),
        };
        state.sections.push(section.clone());
        Ok(section)
    }

    async fn update_section(
        &self,
        section_id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, StoreError> {
        let delay = self.state.lock().delay_next_section_update.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.calls.push(StoreCall::UpdateSection(section_id));
        Self::take_scripted_failure(&mut state, "update_section")?;
        let report = state.report.as_ref().ok_or(StoreError::NotFound {
            endpoint: "update_section".to_string(),
        })?;
        Self::require_draft(report, "update_section")?;
        let section = state
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or(StoreError::NotFound {
                endpoint: "update_section".to_string(),
            })?;
        patch.apply_to(section);
        section.updated_at = Utc::now();
        Ok(section.clone())
    }

    async fn delete_section(&self, section_id: SectionId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::DeleteSection(section_id));
        Self::take_scripted_failure(&mut state, "delete_section")?;
        let report = state.report.as_ref().ok_or(StoreError::NotFound {
            endpoint: "delete_section".to_string(),
        })?;
        Self::require_draft(report, "delete_section")?;
        let before = state.sections.len();
        state.sections.retain(|s| s.id != section_id);
        if state.sections.len() == before {
            return Err(StoreError::NotFound {
                endpoint: "delete_section".to_string(),
            });
        }
        Ok(())
    }

    async fn submit_report(&self, report_id: ReportId) -> Result<Report, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::SubmitReport(report_id));
        Self::take_scripted_failure(&mut state, "submit_report")?;
        let report = state.report.as_mut().ok_or(StoreError::NotFound {
            endpoint: "submit_report".to_string(),
        })?;
        Self::require_draft(report, "submit_report")?;
        let now = Utc::now();
        report.status = ReportStatus::Submitted;
        report.submitted_at = Some(now);
        report.updated_at = now;
        Ok(report.clone())
    }
}
