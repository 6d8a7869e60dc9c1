//! # Report & Section Data Model
//!
//! Wire-faithful data types for a group project report and its ordered
//! sections, plus the partial-update payloads the persistence service
//! accepts. All types serialize with camelCase field names to match the
//! platform's JSON API.
//!
//! ## Ordering
//!
//! Section `order` values are unique within a report at creation time:
//! new sections append at the current section count. Deleting a section
//! does NOT renumber the survivors, so gaps (and, after later appends,
//! duplicate order values) can appear. [`sort_sections`] therefore uses
//! a stable sort — ties keep their insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{GroupId, ProjectId, ReportId, SectionId};
use crate::status::ReportStatus;

/// Markup flavor of a section's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Raw HTML produced by the rich-text editor.
    Html,
    /// Markdown source.
    Markdown,
    /// Plain unstructured text.
    Plain,
}

impl ContentKind {
    /// The canonical wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Plain => "plain",
        }
    }
}

impl Default for ContentKind {
    fn default() -> Self {
        Self::Html
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A group project report, as confirmed by the persistence service.
///
/// Exactly one report exists per (project, group) pair; that uniqueness
/// is enforced server-side. Content fields are mutable only while
/// `status` is [`ReportStatus::Draft`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique report identifier.
    pub id: ReportId,
    /// The project this report is written for.
    pub project_id: ProjectId,
    /// The student group that owns this report.
    pub group_id: GroupId,
    /// Report title.
    pub title: String,
    /// Optional free-form description shown on the report cover.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: ReportStatus,
    /// When the report was handed in. Set only on submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// When the report was last updated (server-derived).
    pub updated_at: DateTime<Utc>,
}

/// One section of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique section identifier.
    pub id: SectionId,
    /// The report this section belongs to.
    pub report_id: ReportId,
    /// Section heading.
    pub title: String,
    /// Raw section content in the markup given by `content_type`.
    #[serde(default)]
    pub content: String,
    /// Markup flavor of `content`.
    #[serde(default)]
    pub content_type: ContentKind,
    /// Zero-based position of this section within the report.
    pub order: u32,
    /// When the section was last updated (server-derived after a
    /// commit; bumped locally on optimistic edits).
    pub updated_at: DateTime<Utc>,
}

impl Section {
    /// Whether the section's content is blank after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Payload for creating a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Report title.
    pub title: String,
    /// Optional cover description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for creating a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSection {
    /// Section heading.
    pub title: String,
    /// Initial content; the server defaults missing content to empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Markup flavor; the server defaults to html.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentKind>,
    /// Zero-based position; callers append at the current section count.
    pub order: u32,
}

/// Partial update to a report's content fields.
///
/// Only set fields are serialized, so the server can distinguish
/// "leave unchanged" from "set to empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    /// New title, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReportPatch {
    /// Whether the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Apply the patch to a report in place.
    pub fn apply_to(&self, report: &mut Report) {
        if let Some(title) = &self.title {
            report.title = title.clone();
        }
        if let Some(description) = &self.description {
            report.description = Some(description.clone());
        }
    }
}

/// Partial update to a section.
///
/// Patches accumulate in the autosave scheduler between commits:
/// merging two patches keeps, per field, the value from the newer one
/// (last-writer-wins within the quiescence window).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    /// New heading, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New content, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New markup flavor, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentKind>,
}

impl SectionPatch {
    /// A patch that only replaces the content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A patch that only replaces the heading.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Whether the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.content_type.is_none()
    }

    /// Fold a newer patch into this one, field-wise last-writer-wins.
    pub fn merge(&mut self, newer: SectionPatch) {
        if newer.title.is_some() {
            self.title = newer.title;
        }
        if newer.content.is_some() {
            self.content = newer.content;
        }
        if newer.content_type.is_some() {
            self.content_type = newer.content_type;
        }
    }

    /// Apply the patch to a section in place, bumping its timestamp.
    pub fn apply_to(&self, section: &mut Section) {
        if let Some(title) = &self.title {
            section.title = title.clone();
        }
        if let Some(content) = &self.content {
            section.content = content.clone();
        }
        if let Some(kind) = self.content_type {
            section.content_type = kind;
        }
        section.updated_at = Utc::now();
    }
}

/// The order value a newly appended section receives: the current count.
pub fn append_order(sections: &[Section]) -> u32 {
    sections.len() as u32
}

/// Sort sections by ascending order index.
///
/// Stable, so sections sharing an order value (possible after deletions
/// followed by appends) keep their insertion order.
pub fn sort_sections(sections: &mut [Section]) {
    sections.sort_by_key(|s| s.order);
}
