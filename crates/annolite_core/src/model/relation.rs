//! Relation record.

use crate::model::document::DocumentId;
use crate::model::span::SpanId;
use serde::{Deserialize, Serialize};

pub type RelationId = i64;

/// Directed, typed edge between two spans of the same document.
///
/// `(from, to)` and `(to, from)` are distinct relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub doc_id: DocumentId,
    pub from_id: SpanId,
    pub to_id: SpanId,
    pub relation_type: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}
