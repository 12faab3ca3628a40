//! Span (annotation) record.

use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};

pub type SpanId = i64;

/// Labeled character range `[start, end)` within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub doc_id: DocumentId,
    pub start: i64,
    pub end: i64,
    pub label: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}
