//! # Report Session
//!
//! [`ReportSession`] is the single owner of one report-editing session:
//! one group, one report, one aggregate, one autosave scheduler. It
//! exposes the engine's full command/query surface to the caller (a UI
//! layer or any other consumer) and is the only place that talks to
//! the persistence store.
//!
//! ## Pipeline
//!
//! Every section edit follows the same path: guard (draft only, known
//! section) → optimistic apply, visible to the caller synchronously →
//! accumulate in the scheduler → commit after the quiescence window
//! (or immediately) → reconcile the server-confirmed entity back in.
//! Commit failures retain the optimistic local content and surface
//! through the save status; the failed patch is re-queued so a manual
//! save re-sends the current merged state.
//!
//! ## Locking discipline
//!
//! All mutable state lives behind one `parking_lot::Mutex` that is
//! never held across an await: lock → merge/snapshot/stamp → unlock →
//! await the network → re-lock → reconcile-if-latest. The debounce
//! timer is a spawned task that may only fire if its epoch is still
//! current, so re-arming or teardown can never abort a commit that has
//! already started — only a timer that is still sleeping.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use rapport_client::{ReportStore, StoreError};
use rapport_core::{
    transition, validate_for_submission, ContentKind, GroupId, NewReport, NewSection, ProjectId,
    Report, ReportPatch, Section, SectionId, SectionPatch, StatusEvent,
};

use crate::aggregate::{ReportAggregate, ReportStats};
use crate::error::EngineError;
use crate::scheduler::{AutosaveConfig, AutosaveScheduler, CommitBatch, SaveMode, SaveStatus};

/// Input for adding a section; the engine assigns the order index.
#[derive(Debug, Clone, Default)]
pub struct SectionDraft {
    /// Section heading.
    pub title: String,
    /// Initial content, if any.
    pub content: Option<String>,
    /// Markup flavor; the service defaults to html.
    pub content_type: Option<ContentKind>,
}

impl SectionDraft {
    /// A draft with only a heading.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

struct SessionState {
    /// `None` until the group's report exists ("no report yet" is a
    /// normal state, not an error).
    aggregate: Option<ReportAggregate>,
    scheduler: AutosaveScheduler,
}

struct SessionInner {
    store: Arc<dyn ReportStore>,
    project_id: ProjectId,
    group_id: GroupId,
    config: AutosaveConfig,
    state: Mutex<SessionState>,
}

/// One report-editing session. See the module docs for the pipeline.
///
/// Not `Clone`: the session exclusively owns its aggregate, and drop
/// (or [`close`](Self::close)) tears the scheduler down so nothing
/// fires afterwards.
pub struct ReportSession {
    inner: Arc<SessionInner>,
}

/// Bound a persistence call by the commit timeout; expiry becomes
/// [`EngineError::Timeout`] instead of a forever-"saving" status.
async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(EngineError::from),
        Err(_) => Err(EngineError::Timeout {
            elapsed_ms: timeout.as_millis() as u64,
        }),
    }
}

fn require_draft(
    aggregate: &ReportAggregate,
    operation: &'static str,
) -> Result<(), EngineError> {
    let status = aggregate.status();
    if status.is_mutable() {
        Ok(())
    } else {
        Err(EngineError::Conflict { status, operation })
    }
}

impl ReportSession {
    /// Create a session without loading anything. Callers typically
    /// use [`open`](Self::open); this exists for flows that know no
    /// report can exist yet.
    pub fn new(
        store: Arc<dyn ReportStore>,
        project_id: ProjectId,
        group_id: GroupId,
        config: AutosaveConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                project_id,
                group_id,
                config,
                state: Mutex::new(SessionState {
                    aggregate: None,
                    scheduler: AutosaveScheduler::new(),
                }),
            }),
        }
    }

    /// Create a session and load the group's report if one exists.
    pub async fn open(
        store: Arc<dyn ReportStore>,
        project_id: ProjectId,
        group_id: GroupId,
        config: AutosaveConfig,
    ) -> Result<Self, EngineError> {
        let session = Self::new(store, project_id, group_id, config);
        session.refresh().await?;
        Ok(session)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The current report, if one exists.
    pub fn report(&self) -> Option<Report> {
        let state = self.inner.state.lock();
        state.aggregate.as_ref().map(|a| a.report().clone())
    }

    /// Sections in report order. Empty when no report exists.
    pub fn sections(&self) -> Vec<Section> {
        let state = self.inner.state.lock();
        state
            .aggregate
            .as_ref()
            .map(|a| a.sections().to_vec())
            .unwrap_or_default()
    }

    /// The single autosave status indicator.
    pub fn save_status(&self) -> SaveStatus {
        self.inner.state.lock().scheduler.status().clone()
    }

    /// When the last commit succeeded, if ever.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().scheduler.last_saved_at()
    }

    /// Whether content is editable: a report exists and is in draft.
    pub fn can_edit(&self) -> bool {
        let state = self.inner.state.lock();
        state
            .aggregate
            .as_ref()
            .is_some_and(|a| a.status().is_mutable())
    }

    /// Whether the report would pass the submission validator right now.
    pub fn can_submit(&self) -> bool {
        let state = self.inner.state.lock();
        state.aggregate.as_ref().is_some_and(|a| a.is_submittable())
    }

    /// Whether local edits exist that are not yet confirmed durable.
    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.state.lock().scheduler.has_unsaved_changes()
    }

    /// Derived progress counters; zeroes when no report exists.
    pub fn stats(&self) -> ReportStats {
        let state = self.inner.state.lock();
        state
            .aggregate
            .as_ref()
            .map(|a| a.stats())
            .unwrap_or_default()
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Re-fetch the report from the service, replacing the aggregate.
    ///
    /// An explicit reload: pending local edits and timers are
    /// discarded first.
    pub async fn refresh(&self) -> Result<Option<Report>, EngineError> {
        self.inner.state.lock().scheduler.cancel();

        let doc = self
            .inner
            .store
            .fetch_report(self.inner.project_id, self.inner.group_id)
            .await?;

        let mut state = self.inner.state.lock();
        state.aggregate = doc.map(|d| ReportAggregate::new(d.report, d.sections));
        Ok(state.aggregate.as_ref().map(|a| a.report().clone()))
    }

    /// Create the group's report. The service enforces one report per
    /// (project, group) pair.
    pub async fn create_report(&self, payload: NewReport) -> Result<Report, EngineError> {
        let report = bounded(
            self.inner.config.commit_timeout,
            self.inner
                .store
                .create_report(self.inner.project_id, self.inner.group_id, &payload),
        )
        .await?;

        let mut state = self.inner.state.lock();
        state.aggregate = Some(ReportAggregate::new(report.clone(), Vec::new()));
        tracing::info!(report = %report.id, "report created");
        Ok(report)
    }

    /// Update report content fields (title, description).
    ///
    /// Applied optimistically, committed directly (report metadata
    /// edits come from an explicit form, not from typing), then
    /// reconciled. On failure the optimistic copy is retained and the
    /// error is returned.
    pub async fn update_report(&self, patch: ReportPatch) -> Result<Report, EngineError> {
        let report_id = {
            let mut state = self.inner.state.lock();
            let agg = state.aggregate.as_mut().ok_or(EngineError::NoReport)?;
            require_draft(agg, "update report")?;
            agg.apply_report_patch(&patch);
            agg.report().id
        };

        let confirmed = bounded(
            self.inner.config.commit_timeout,
            self.inner.store.update_report(report_id, &patch),
        )
        .await?;

        let mut state = self.inner.state.lock();
        if let Some(agg) = state.aggregate.as_mut() {
            agg.replace_report(confirmed.clone());
        }
        Ok(confirmed)
    }

    /// Append a section at the end of the report.
    pub async fn add_section(&self, draft: SectionDraft) -> Result<Section, EngineError> {
        let (report_id, payload) = {
            let state = self.inner.state.lock();
            let agg = state.aggregate.as_ref().ok_or(EngineError::NoReport)?;
            require_draft(agg, "add section")?;
            let payload = NewSection {
                title: draft.title,
                content: draft.content,
                content_type: draft.content_type,
                order: agg.next_order(),
            };
            (agg.report().id, payload)
        };

        let section = bounded(
            self.inner.config.commit_timeout,
            self.inner.store.create_section(report_id, &payload),
        )
        .await?;

        let mut state = self.inner.state.lock();
        if let Some(agg) = state.aggregate.as_mut() {
            agg.insert_section(section.clone());
        }
        Ok(section)
    }

    /// Edit a section. The patch is applied to local state immediately
    /// and returned to the caller; durability follows per `mode` —
    /// coalesced into the quiescence window, or committed before this
    /// call returns.
    pub async fn update_section(
        &self,
        id: SectionId,
        patch: SectionPatch,
        mode: SaveMode,
    ) -> Result<Section, EngineError> {
        let optimistic = {
            let mut state = self.inner.state.lock();
            let agg = state.aggregate.as_mut().ok_or(EngineError::NoReport)?;
            require_draft(agg, "update section")?;
            let optimistic = agg
                .apply_section_patch(id, &patch)
                .ok_or(EngineError::UnknownSection { id })?;
            state.scheduler.record_edit(id, patch);
            if mode == SaveMode::Debounced {
                self.arm_timer(&mut state);
            }
            optimistic
        };

        match mode {
            SaveMode::Debounced => Ok(optimistic),
            SaveMode::Immediate => {
                self.save_now().await?;
                let state = self.inner.state.lock();
                Ok(state
                    .aggregate
                    .as_ref()
                    .and_then(|a| a.section(id))
                    .cloned()
                    .unwrap_or(optimistic))
            }
        }
    }

    /// Delete a section. Surviving order values are not renumbered.
    pub async fn delete_section(&self, id: SectionId) -> Result<(), EngineError> {
        {
            let mut state = self.inner.state.lock();
            {
                let agg = state.aggregate.as_ref().ok_or(EngineError::NoReport)?;
                require_draft(agg, "delete section")?;
                if agg.section(id).is_none() {
                    return Err(EngineError::UnknownSection { id });
                }
            }
            // Never let a queued autosave fire against a deleted section.
            state.scheduler.drop_pending_for(id);
        }

        bounded(
            self.inner.config.commit_timeout,
            self.inner.store.delete_section(id),
        )
        .await?;

        let mut state = self.inner.state.lock();
        if let Some(agg) = state.aggregate.as_mut() {
            agg.remove_section(id);
        }
        Ok(())
    }

    /// Commit the current optimistic state now, bypassing the
    /// quiescence window.
    ///
    /// Postcondition: no pending timer, no in-flight commit, and every
    /// edit made before this call either confirmed durable or reported
    /// through the returned error (and the save status).
    pub async fn save_now(&self) -> Result<(), EngineError> {
        // Disarm the timer and wait out commits already in flight. A
        // failed in-flight commit re-queues its patches, so they are
        // picked up by the batch below rather than lost.
        let in_flight = {
            let mut state = self.inner.state.lock();
            state.scheduler.cancel_timer();
            state.scheduler.take_in_flight()
        };
        for handle in in_flight {
            // JoinError covers aborted tasks; the commit is gone either way.
            let _ = handle.await;
        }

        let batch = {
            let mut state = self.inner.state.lock();
            match state.scheduler.begin_commit() {
                Some(batch) => batch,
                None => return Ok(()),
            }
        };
        SessionInner::execute_batch(&self.inner, batch).await
    }

    /// Hand the report in.
    ///
    /// Flushes any pending/in-flight autosave first, then validates,
    /// then transitions — the validator sees exactly the content that
    /// will be submitted, and no autosave commit can race the
    /// transition. No network call is made when validation fails.
    pub async fn submit(&self) -> Result<Report, EngineError> {
        self.save_now().await?;

        let report_id = {
            let state = self.inner.state.lock();
            let agg = state.aggregate.as_ref().ok_or(EngineError::NoReport)?;
            transition(agg.status(), StatusEvent::Submit).map_err(|_| EngineError::Conflict {
                status: agg.status(),
                operation: "submit",
            })?;
            validate_for_submission(agg.sections())?;
            agg.report().id
        };

        let confirmed = bounded(
            self.inner.config.commit_timeout,
            self.inner.store.submit_report(report_id),
        )
        .await?;

        let mut state = self.inner.state.lock();
        if let Some(agg) = state.aggregate.as_mut() {
            agg.replace_report(confirmed.clone());
        }
        tracing::info!(report = %confirmed.id, "report submitted");
        Ok(confirmed)
    }

    /// End the session: cancel the pending timer, abort in-flight
    /// commits, discard pending optimistic state. Also runs on drop.
    pub fn close(&self) {
        self.inner.state.lock().scheduler.cancel();
        tracing::debug!("report session closed");
    }

    // ── Internals ───────────────────────────────────────────────────

    /// (Re)arm the debounce timer. Any previously armed, still
    /// sleeping timer is superseded.
    fn arm_timer(&self, state: &mut SessionState) {
        let epoch = state.scheduler.bump_epoch();
        let inner = Arc::clone(&self.inner);
        let quiescence = self.inner.config.quiescence;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiescence).await;
            SessionInner::fire_debounced(inner, epoch).await;
        });
        state.scheduler.arm_timer(handle);
    }
}

impl SessionInner {
    /// A debounce timer elapsed. Fires only if no edit or teardown
    /// re-armed since it was scheduled; the commit itself runs as a
    /// separate tracked task so flushes can wait for it.
    async fn fire_debounced(inner: Arc<SessionInner>, epoch: u64) {
        let mut state = inner.state.lock();
        if !state.scheduler.claim_timer_fire(epoch) {
            return;
        }
        let batch = match state.scheduler.begin_commit() {
            Some(batch) => batch,
            None => return,
        };
        let exec_inner = Arc::clone(&inner);
        let handle = tokio::spawn(async move {
            if let Err(e) = SessionInner::execute_batch(&exec_inner, batch).await {
                // Already folded into the save status; scheduled
                // commits have no caller to re-throw to.
                tracing::warn!(error = %e, "scheduled autosave commit failed");
            }
        });
        state.scheduler.push_in_flight(handle);
    }

    /// Execute a stamped batch: one update per dirty section, then a
    /// single completion that only takes effect if this batch is still
    /// the latest issued.
    async fn execute_batch(inner: &Arc<SessionInner>, batch: CommitBatch) -> Result<(), EngineError> {
        let CommitBatch { generation, items } = batch;

        let mut confirmed = Vec::new();
        let mut failures = Vec::new();
        for (section_id, patch) in items {
            match bounded(
                inner.config.commit_timeout,
                inner.store.update_section(section_id, &patch),
            )
            .await
            {
                Ok(section) => confirmed.push(section),
                Err(err) => failures.push((section_id, patch, err)),
            }
        }

        let mut state = inner.state.lock();
        let status_message = failures.first().map(|(_, _, e)| e.to_string());
        if !state.scheduler.complete_commit(generation, status_message) {
            // Superseded: a newer commit owns the status and carried
            // newer content. Nothing here may touch state.
            return Ok(());
        }

        for section in confirmed {
            // Sections re-edited while this commit was in flight keep
            // their newer local content until the next commit.
            if state.scheduler.is_dirty(section.id) {
                continue;
            }
            if let Some(agg) = state.aggregate.as_mut() {
                agg.reconcile_section(section);
            }
        }

        let mut first_error = None;
        for (section_id, patch, err) in failures {
            // Local optimistic content stays; the patch is re-queued
            // so a manual save re-sends the current merged state.
            state.scheduler.requeue(section_id, patch);
            first_error.get_or_insert(err);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ReportSession {
    fn drop(&mut self) {
        self.close();
    }
}
