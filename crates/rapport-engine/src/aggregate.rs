//! # Report Aggregate
//!
//! The in-memory representation of one report and its ordered
//! sections, exclusively owned by a single editing session. All
//! mutation here is optimistic — the session layer decides when the
//! persistence service confirms or rejects it, and reconciles
//! server-confirmed entities back in through [`replace_report`] /
//! [`reconcile_section`].
//!
//! [`replace_report`]: ReportAggregate::replace_report
//! [`reconcile_section`]: ReportAggregate::reconcile_section

use rapport_core::{
    append_order, sort_sections, validate_for_submission, word_count, Report, ReportPatch,
    ReportStatus, Section, SectionId, SectionPatch,
};

/// Derived counters for the report progress indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Total number of sections.
    pub section_count: usize,
    /// Sections with non-blank content.
    pub completed_sections: usize,
    /// Sections whose content trims to empty.
    pub empty_sections: usize,
    /// Whitespace-separated words across all section content.
    pub word_count: usize,
    /// Characters across all section content.
    pub character_count: usize,
}

/// One report plus its ordered sections.
#[derive(Debug, Clone)]
pub struct ReportAggregate {
    report: Report,
    sections: Vec<Section>,
}

impl ReportAggregate {
    /// Build an aggregate from server-confirmed state. Sections are
    /// sorted by order index on the way in.
    pub fn new(report: Report, mut sections: Vec<Section>) -> Self {
        sort_sections(&mut sections);
        Self { report, sections }
    }

    /// The report.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Sections in report order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ReportStatus {
        self.report.status
    }

    /// Look up a section.
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The order index a newly appended section receives.
    pub fn next_order(&self) -> u32 {
        append_order(&self.sections)
    }

    /// Optimistically apply a report content patch.
    pub fn apply_report_patch(&mut self, patch: &ReportPatch) {
        patch.apply_to(&mut self.report);
    }

    /// Optimistically apply a section patch, returning the updated
    /// copy, or `None` for an unknown section.
    pub fn apply_section_patch(&mut self, id: SectionId, patch: &SectionPatch) -> Option<Section> {
        let section = self.sections.iter_mut().find(|s| s.id == id)?;
        patch.apply_to(section);
        Some(section.clone())
    }

    /// Insert a server-confirmed new section, keeping report order.
    pub fn insert_section(&mut self, section: Section) {
        self.sections.push(section);
        sort_sections(&mut self.sections);
    }

    /// Remove a section. Surviving order values are NOT renumbered —
    /// gaps are tolerated, relative order is what consumers rely on.
    pub fn remove_section(&mut self, id: SectionId) -> Option<Section> {
        let idx = self.sections.iter().position(|s| s.id == id)?;
        Some(self.sections.remove(idx))
    }

    /// Replace the report with a server-confirmed copy.
    pub fn replace_report(&mut self, report: Report) {
        self.report = report;
    }

    /// Reconcile a server-confirmed section into the aggregate,
    /// replacing the optimistic local copy. A section that was deleted
    /// locally while the commit was in flight is NOT resurrected.
    pub fn reconcile_section(&mut self, section: Section) {
        if let Some(local) = self.sections.iter_mut().find(|s| s.id == section.id) {
            *local = section;
            sort_sections(&mut self.sections);
        }
    }

    /// Whether the report is currently submit-eligible.
    pub fn is_submittable(&self) -> bool {
        self.report.status.is_mutable() && validate_for_submission(&self.sections).is_ok()
    }

    /// Derived progress counters.
    pub fn stats(&self) -> ReportStats {
        let mut stats = ReportStats {
            section_count: self.sections.len(),
            ..ReportStats::default()
        };
        for section in &self.sections {
            if section.is_blank() {
                stats.empty_sections += 1;
            } else {
                stats.completed_sections += 1;
            }
            stats.word_count += word_count(&section.content);
            stats.character_count += section.content.chars().count();
        }
        stats
    }
}
