//! # Submission Validator
//!
//! Pure submit-eligibility predicate over a report's ordered section
//! list. Performs no I/O and knows nothing about the scheduler, so it
//! can be unit-tested (and property-tested) in isolation; the engine
//! calls it as the guard of the `submit` command.

use thiserror::Error;

use crate::report::Section;

/// Reasons a report is not eligible for submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The report has no sections at all.
    #[error("a report must contain at least one section before it can be submitted")]
    EmptyReport,

    /// One or more sections are blank after trimming whitespace.
    /// Titles are listed in report order, not alphabetically.
    #[error("these sections have no content yet: {}", .titles.join(", "))]
    BlankSections {
        /// Headings of the offending sections, in report order.
        titles: Vec<String>,
    },
}

/// Decide submit-eligibility for the given sections.
///
/// `sections` must already be in report order; offending titles are
/// reported in the order they appear here.
pub fn validate_for_submission(sections: &[Section]) -> Result<(), ValidationError> {
    if sections.is_empty() {
        return Err(ValidationError::EmptyReport);
    }

    let blank_titles: Vec<String> = sections
        .iter()
        .filter(|s| s.is_blank())
        .map(|s| s.title.clone())
        .collect();

    if !blank_titles.is_empty() {
        return Err(ValidationError::BlankSections {
            titles: blank_titles,
        });
    }

    Ok(())
}

/// Number of whitespace-separated words in a piece of content.
///
/// Used by the engine's derived report stats; counts raw tokens, so
/// markup tags in html content count as words. Good enough for the
/// progress indicator this feeds.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
