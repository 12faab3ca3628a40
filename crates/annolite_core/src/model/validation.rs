//! Write-time validation rules for spans, relations and projects.
//!
//! # Responsibility
//! - Express every write-time invariant as a pure check so single-entity
//!   services and bulk sync apply identical rules.
//!
//! # Invariants
//! - Checks never touch storage; callers load the data they compare against.
//! - Overlap is the open-interval test: touching at a boundary is allowed.

use crate::model::document::DocumentId;
use crate::model::project::Project;
use crate::model::span::{Span, SpanId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reasons raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Project name is blank after trim.
    EmptyName,
    /// Another project already uses this name.
    NameConflict(String),
    /// Label is not in the owning project's label set.
    InvalidLabel(String),
    /// Range is empty, negative or past the end of the text.
    InvalidRange { start: i64, end: i64, text_len: i64 },
    /// Range shares characters with an existing span.
    OverlapConflict {
        start: i64,
        end: i64,
        existing: SpanId,
    },
    /// Relation endpoint belongs to a different document.
    EndpointMismatch { doc_id: DocumentId, span_id: SpanId },
    /// Relation type is not in the owning project's relation-type set.
    InvalidType(String),
    /// Same document, ordered endpoints and type already exist.
    DuplicateRelation {
        from_id: SpanId,
        to_id: SpanId,
        relation_type: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "project name must not be blank"),
            Self::NameConflict(name) => write!(f, "project name already exists: `{name}`"),
            Self::InvalidLabel(label) => write!(f, "label not in project: `{label}`"),
            Self::InvalidRange {
                start,
                end,
                text_len,
            } => write!(
                f,
                "invalid span [{start}, {end}) for text of length {text_len}"
            ),
            Self::OverlapConflict {
                start,
                end,
                existing,
            } => write!(f, "span [{start}, {end}) overlaps span {existing}"),
            Self::EndpointMismatch { doc_id, span_id } => {
                write!(f, "span {span_id} does not belong to document {doc_id}")
            }
            Self::InvalidType(relation_type) => {
                write!(f, "relation type not in project: `{relation_type}`")
            }
            Self::DuplicateRelation {
                from_id,
                to_id,
                relation_type,
            } => write!(
                f,
                "relation {from_id} -> {to_id} of type `{relation_type}` already exists"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Checks `0 <= start < end <= text_len`.
pub fn check_range(start: i64, end: i64, text_len: i64) -> Result<(), ValidationError> {
    if start < 0 || end < 0 || start >= end || end > text_len {
        return Err(ValidationError::InvalidRange {
            start,
            end,
            text_len,
        });
    }
    Ok(())
}

/// Open-interval overlap test for two half-open ranges.
pub fn ranges_overlap(start: i64, end: i64, other_start: i64, other_end: i64) -> bool {
    !(end <= other_start || start >= other_end)
}

/// Rejects `[start, end)` if it overlaps any span in `existing`, skipping the
/// span with id `exclude` (the one being updated).
pub fn check_no_overlap<'a>(
    start: i64,
    end: i64,
    existing: impl IntoIterator<Item = &'a Span>,
    exclude: Option<SpanId>,
) -> Result<(), ValidationError> {
    let conflict = existing
        .into_iter()
        .filter(|span| Some(span.id) != exclude)
        .find(|span| ranges_overlap(start, end, span.start, span.end));

    match conflict {
        Some(span) => Err(ValidationError::OverlapConflict {
            start,
            end,
            existing: span.id,
        }),
        None => Ok(()),
    }
}

pub fn check_label(project: &Project, label: &str) -> Result<(), ValidationError> {
    if project.has_label(label) {
        Ok(())
    } else {
        Err(ValidationError::InvalidLabel(label.to_string()))
    }
}

pub fn check_relation_type(project: &Project, relation_type: &str) -> Result<(), ValidationError> {
    if project.has_relation_type(relation_type) {
        Ok(())
    } else {
        Err(ValidationError::InvalidType(relation_type.to_string()))
    }
}

/// Runs the full span rule set in contract order: label, range, overlap.
pub fn validate_span<'a>(
    project: &Project,
    text_len: i64,
    start: i64,
    end: i64,
    label: &str,
    existing: impl IntoIterator<Item = &'a Span>,
    exclude: Option<SpanId>,
) -> Result<(), ValidationError> {
    check_label(project, label)?;
    check_range(start, end, text_len)?;
    if !project.allow_overlap {
        check_no_overlap(start, end, existing, exclude)?;
    }
    Ok(())
}

/// Normalizes a project name, rejecting blank input.
pub fn normalize_project_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
