//! # Autosave Scheduler State
//!
//! Bookkeeping for debounced autosave: the accumulated per-section
//! patches awaiting commit, the armed debounce timer, in-flight commit
//! tasks, the single save-status indicator, and the generation counter
//! that suppresses stale out-of-order completions.
//!
//! This module owns STATE only; it never performs I/O. The session
//! (`crate::session`) drives it: arm the timer on a debounced edit,
//! [`begin_commit`](AutosaveScheduler::begin_commit) to snapshot and
//! stamp a batch, execute the network calls with the lock released,
//! then [`complete_commit`](AutosaveScheduler::complete_commit) with
//! the batch's generation. Keeping the state transitions synchronous
//! makes the discard-if-stale rule unit-testable without a network or
//! a runtime.
//!
//! ## Generations
//!
//! There is exactly one save-status value, but commits can overlap (a
//! manual save racing a scheduled one). Every batch is stamped with a
//! monotonically increasing generation; a completion only touches the
//! status if its generation is still the latest issued. A stale
//! completion is logged and otherwise ignored, including its failed
//! patches, which by definition were superseded by a newer batch.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use rapport_core::{SectionId, SectionPatch};

/// Tuning for the autosave scheduler.
#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    /// Quiescence window: a debounced commit fires after this long
    /// with no further edits (default: 2000 ms).
    pub quiescence: Duration,
    /// Upper bound on any single commit; expiry surfaces as an error
    /// status instead of a forever-"saving" indicator (default: 30 s).
    pub commit_timeout: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(2000),
            commit_timeout: Duration::from_secs(30),
        }
    }
}

impl AutosaveConfig {
    /// Config with a custom quiescence window, keeping the default
    /// commit timeout. Tests use short windows.
    pub fn with_quiescence(quiescence: Duration) -> Self {
        Self {
            quiescence,
            ..Self::default()
        }
    }
}

/// How an edit should reach the persistence service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Coalesce into the debounce window (the default for typing).
    Debounced,
    /// Commit right away, e.g. before navigating away.
    Immediate,
}

/// The single save-status indicator exposed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing pending, nothing in flight.
    Idle,
    /// A commit is in flight.
    Saving,
    /// The latest commit succeeded.
    Saved,
    /// The latest commit failed; local edits are retained.
    Error {
        /// Failure description for display.
        message: String,
    },
}

impl SaveStatus {
    /// The canonical name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error { .. } => "error",
        }
    }

    /// Whether a commit is currently in flight.
    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Saving)
    }

    /// Whether the latest commit failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl Default for SaveStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A snapshot of pending patches stamped for commit.
#[derive(Debug)]
pub struct CommitBatch {
    /// Generation stamp; compared against the latest issued at
    /// completion time.
    pub generation: u64,
    /// Per-section merged patches, drained from the pending map.
    pub items: Vec<(SectionId, SectionPatch)>,
}

/// Autosave bookkeeping owned by one report session.
#[derive(Default)]
pub struct AutosaveScheduler {
    /// Accumulated patches not yet handed to a commit.
    pending: HashMap<SectionId, SectionPatch>,
    /// The armed debounce timer, if any. Only ever holds a task that
    /// has not yet claimed its fire; claiming happens under the
    /// session lock, so aborting this handle never kills a commit.
    timer: Option<JoinHandle<()>>,
    /// Bumped on every (re)arm and on cancel; a timer task may only
    /// fire if its epoch is still current.
    timer_epoch: u64,
    /// Commits spawned by the timer that may still be running.
    in_flight: Vec<JoinHandle<()>>,
    /// Generation of the most recently issued commit.
    latest_issued: u64,
    status: SaveStatus,
    last_saved_at: Option<DateTime<Utc>>,
}

impl AutosaveScheduler {
    /// Fresh scheduler: idle, nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current save status.
    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    /// Timestamp of the last successful save.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Whether edits exist that are not yet confirmed durable:
    /// pending patches, an armed timer, or a commit still in flight.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
            || self.timer.is_some()
            || self.status.is_saving()
            || self.in_flight.iter().any(|h| !h.is_finished())
    }

    /// Whether a newer local edit exists for this section than any
    /// in-flight commit carries.
    pub fn is_dirty(&self, section_id: SectionId) -> bool {
        self.pending.contains_key(&section_id)
    }

    /// Fold an edit into the pending map (per-field last-writer-wins).
    pub fn record_edit(&mut self, section_id: SectionId, patch: SectionPatch) {
        self.pending.entry(section_id).or_default().merge(patch);
    }

    /// Drop any pending patch for a section (used when the section is
    /// deleted so no commit fires against it afterwards).
    pub fn drop_pending_for(&mut self, section_id: SectionId) {
        self.pending.remove(&section_id);
    }

    /// Snapshot and stamp everything pending as one commit batch, and
    /// flip the status to `Saving`. Returns `None` when there is
    /// nothing to commit.
    pub fn begin_commit(&mut self) -> Option<CommitBatch> {
        if self.pending.is_empty() {
            return None;
        }
        self.latest_issued += 1;
        self.status = SaveStatus::Saving;
        let items: Vec<(SectionId, SectionPatch)> = self.pending.drain().collect();
        tracing::debug!(
            generation = self.latest_issued,
            sections = items.len(),
            "autosave commit issued"
        );
        Some(CommitBatch {
            generation: self.latest_issued,
            items,
        })
    }

    /// Apply a commit's completion to the status, unless a newer
    /// commit has been issued since. Returns whether the completion
    /// was applied.
    pub fn complete_commit(&mut self, generation: u64, error: Option<String>) -> bool {
        if generation != self.latest_issued {
            tracing::debug!(
                generation,
                latest = self.latest_issued,
                "discarding stale commit completion"
            );
            return false;
        }
        self.status = match error {
            None => {
                self.last_saved_at = Some(Utc::now());
                SaveStatus::Saved
            }
            Some(message) => {
                tracing::warn!(generation, %message, "autosave commit failed");
                SaveStatus::Error { message }
            }
        };
        true
    }

    /// Put a failed patch back so the next commit (a manual save, or a
    /// later debounced one) re-sends it. Edits made after the failed
    /// batch was drained take precedence over the failed content.
    pub fn requeue(&mut self, section_id: SectionId, failed: SectionPatch) {
        match self.pending.remove(&section_id) {
            Some(newer) => {
                let mut merged = failed;
                merged.merge(newer);
                self.pending.insert(section_id, merged);
            }
            None => {
                self.pending.insert(section_id, failed);
            }
        }
    }

    /// Invalidate the current timer epoch, returning the new one.
    /// Called before arming a fresh timer and on cancellation.
    pub fn bump_epoch(&mut self) -> u64 {
        self.timer_epoch += 1;
        self.timer_epoch
    }

    /// Arm the debounce timer, aborting any previously armed (still
    /// sleeping) one.
    pub fn arm_timer(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.timer.replace(handle) {
            old.abort();
        }
    }

    /// A timer task claims its fire: valid only if no edit or
    /// cancellation re-armed since it was scheduled. On success the
    /// timer slot is cleared (the task is past its sleep; nothing is
    /// left to abort).
    pub fn claim_timer_fire(&mut self, epoch: u64) -> bool {
        if epoch != self.timer_epoch {
            return false;
        }
        self.timer = None;
        true
    }

    /// Disarm the timer without firing it.
    pub fn cancel_timer(&mut self) {
        self.bump_epoch();
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Track a commit task spawned by the timer.
    pub fn push_in_flight(&mut self, handle: JoinHandle<()>) {
        // Opportunistically drop handles of commits that already ran
        // to completion.
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(handle);
    }

    /// Take ownership of all in-flight commit handles (to await them
    /// during a flush).
    pub fn take_in_flight(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.in_flight)
    }

    /// Tear down: disarm the timer, abort in-flight commits, and drop
    /// pending optimistic state. Nothing fires after this.
    pub fn cancel(&mut self) {
        self.cancel_timer();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
        if !self.pending.is_empty() {
            tracing::debug!(
                sections = self.pending.len(),
                "discarding pending autosave patches on teardown"
            );
            self.pending.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(content: &str) -> SectionPatch {
        SectionPatch::content(content)
    }

    #[test]
    fn edits_to_one_section_coalesce_into_one_batch_item() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();
        sched.record_edit(id, patch("a"));
        sched.record_edit(id, patch("ab"));
        sched.record_edit(id, patch("abc"));

        let batch = sched.begin_commit().expect("batch");
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].1.content.as_deref(), Some("abc"));
        // Drained: a second begin has nothing to do.
        assert!(sched.begin_commit().is_none());
    }

    #[test]
    fn begin_commit_stamps_increasing_generations_and_sets_saving() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();

        sched.record_edit(id, patch("one"));
        let first = sched.begin_commit().expect("first");
        assert_eq!(first.generation, 1);
        assert!(sched.status().is_saving());

        sched.record_edit(id, patch("two"));
        let second = sched.begin_commit().expect("second");
        assert_eq!(second.generation, 2);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();

        sched.record_edit(id, patch("slow"));
        let slow = sched.begin_commit().expect("slow batch");
        sched.record_edit(id, patch("fast"));
        let fast = sched.begin_commit().expect("fast batch");

        // The newer commit completes first.
        assert!(sched.complete_commit(fast.generation, None));
        assert_eq!(sched.status(), &SaveStatus::Saved);
        let saved_at = sched.last_saved_at().expect("stamped");

        // The slow one finishing afterwards must not touch anything —
        // not even to report its own success.
        assert!(!sched.complete_commit(slow.generation, None));
        assert_eq!(sched.status(), &SaveStatus::Saved);
        assert_eq!(sched.last_saved_at(), Some(saved_at));
    }

    #[test]
    fn stale_failure_does_not_overwrite_newer_success() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();

        sched.record_edit(id, patch("v1"));
        let old = sched.begin_commit().expect("old");
        sched.record_edit(id, patch("v2"));
        let new = sched.begin_commit().expect("new");

        assert!(sched.complete_commit(new.generation, None));
        assert!(!sched.complete_commit(old.generation, Some("boom".to_string())));
        assert_eq!(sched.status(), &SaveStatus::Saved);
    }

    #[test]
    fn failed_completion_sets_error_and_keeps_last_saved_at() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();

        sched.record_edit(id, patch("x"));
        let batch = sched.begin_commit().expect("batch");
        assert!(sched.complete_commit(batch.generation, Some("503 from service".to_string())));

        match sched.status() {
            SaveStatus::Error { message } => assert_eq!(message, "503 from service"),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(sched.last_saved_at(), None);
    }

    #[test]
    fn requeue_keeps_newer_edits_over_failed_content() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();

        // A failed batch carried {content: "old", title: "Intro"}.
        let failed = SectionPatch {
            title: Some("Intro".to_string()),
            content: Some("old".to_string()),
            content_type: None,
        };
        // Meanwhile the user typed newer content.
        sched.record_edit(id, patch("newer"));
        sched.requeue(id, failed);

        let batch = sched.begin_commit().expect("batch");
        let (_, merged) = &batch.items[0];
        assert_eq!(merged.content.as_deref(), Some("newer"));
        // The failed title survives: nothing newer replaced it.
        assert_eq!(merged.title.as_deref(), Some("Intro"));
    }

    #[test]
    fn requeue_without_newer_edits_restores_failed_patch() {
        let mut sched = AutosaveScheduler::new();
        let id = SectionId::new();
        sched.requeue(id, patch("lost write"));

        let batch = sched.begin_commit().expect("batch");
        assert_eq!(batch.items[0].1.content.as_deref(), Some("lost write"));
    }

    #[test]
    fn dropped_section_never_reaches_a_batch() {
        let mut sched = AutosaveScheduler::new();
        let keep = SectionId::new();
        let gone = SectionId::new();
        sched.record_edit(keep, patch("keep"));
        sched.record_edit(gone, patch("gone"));
        sched.drop_pending_for(gone);

        let batch = sched.begin_commit().expect("batch");
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].0, keep);
    }

    #[test]
    fn epoch_claim_rejects_superseded_timer() {
        let mut sched = AutosaveScheduler::new();
        let stale = sched.bump_epoch();
        let current = sched.bump_epoch();
        assert!(!sched.claim_timer_fire(stale));
        assert!(sched.claim_timer_fire(current));
    }

    #[test]
    fn cancel_timer_invalidates_outstanding_epoch() {
        let mut sched = AutosaveScheduler::new();
        let epoch = sched.bump_epoch();
        sched.cancel_timer();
        assert!(!sched.claim_timer_fire(epoch));
    }

    #[test]
    fn unsaved_changes_covers_pending_and_in_flight() {
        let mut sched = AutosaveScheduler::new();
        assert!(!sched.has_unsaved_changes());
        let id = SectionId::new();
        sched.record_edit(id, patch("x"));
        assert!(sched.has_unsaved_changes());

        // Drained into a batch: still unsaved until the commit lands.
        let batch = sched.begin_commit().expect("batch");
        assert!(sched.has_unsaved_changes());

        sched.complete_commit(batch.generation, None);
        assert!(!sched.has_unsaved_changes());
    }

    #[test]
    fn cancel_discards_pending_state() {
        let mut sched = AutosaveScheduler::new();
        sched.record_edit(SectionId::new(), patch("doomed"));
        sched.cancel();
        assert!(!sched.has_unsaved_changes());
        assert!(sched.begin_commit().is_none());
    }

    #[test]
    fn save_status_names() {
        assert_eq!(SaveStatus::Idle.as_str(), "idle");
        assert_eq!(SaveStatus::Saving.as_str(), "saving");
        assert_eq!(SaveStatus::Saved.as_str(), "saved");
        let err = SaveStatus::Error {
            message: "x".to_string(),
        };
        assert_eq!(err.as_str(), "error");
        assert!(err.is_error());
    }

    #[test]
    fn default_config_matches_product_tuning() {
        let config = AutosaveConfig::default();
        assert_eq!(config.quiescence, Duration::from_millis(2000));
        assert_eq!(config.commit_timeout, Duration::from_secs(30));
    }
}
