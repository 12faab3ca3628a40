//! Annotation domain model.
//!
//! # Responsibility
//! - Define the records persisted by the store: projects, documents, spans
//!   and relations.
//! - Provide pure validation helpers shared by single-entity writes and bulk
//!   sync.
//!
//! # Invariants
//! - Span offsets are character offsets into `Document::text`, half-open.
//! - Identifiers are assigned by the store and never reused.

pub mod document;
pub mod project;
pub mod relation;
pub mod span;
pub mod validation;

use crate::model::document::DocumentId;
use crate::model::project::ProjectId;
use crate::model::relation::RelationId;
use crate::model::span::SpanId;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Names the thing a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Project(ProjectId),
    ProjectName(String),
    Document(DocumentId),
    Span(SpanId),
    Relation(RelationId),
    File(PathBuf),
    ImageDir(PathBuf),
    Image(String),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project {id}"),
            Self::ProjectName(name) => write!(f, "project `{name}`"),
            Self::Document(id) => write!(f, "document {id}"),
            Self::Span(id) => write!(f, "span {id}"),
            Self::Relation(id) => write!(f, "relation {id}"),
            Self::File(path) => write!(f, "file `{}`", path.display()),
            Self::ImageDir(path) => write!(f, "image directory `{}`", path.display()),
            Self::Image(name) => write!(f, "image `{name}`"),
        }
    }
}
