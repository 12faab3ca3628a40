//! Document record.

use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};

pub type DocumentId = i64;

/// Status assigned to documents created by file import and bulk sync.
pub const STATUS_PENDING: &str = "pending";

/// One annotatable text owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub text: String,
    /// Free-form workflow tag such as `pending`.
    pub status: Option<String>,
    /// Source path when the document came from a split file.
    pub source_file: Option<String>,
    /// Position of this unit within the split sequence of `source_file`.
    pub unit_index: Option<i64>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Document {
    /// Text length in characters, the unit every span offset is expressed in.
    pub fn char_len(&self) -> i64 {
        self.text.chars().count() as i64
    }

    /// Returns `text[start..end)` by character offsets.
    pub fn fragment(&self, start: i64, end: i64) -> Option<&str> {
        char_slice(&self.text, start, end)
    }
}

/// Insert model for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub text: String,
    pub status: Option<String>,
    pub source_file: Option<String>,
    pub unit_index: Option<i64>,
}

impl NewDocument {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Slices `text` by half-open character offsets.
///
/// Returns `None` when the range is empty, reversed, or out of bounds.
pub fn char_slice(text: &str, start: i64, end: i64) -> Option<&str> {
    if start < 0 || end <= start {
        return None;
    }
    let (start, end) = (start as usize, end as usize);
    let mut offsets = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()));
    let byte_start = offsets.nth(start)?;
    let byte_end = offsets.nth(end - start - 1)?;
    Some(&text[byte_start..byte_end])
}

#[cfg(test)]
mod tests {
    use super::char_slice;

    #[test]
    fn char_slice_uses_character_offsets() {
        assert_eq!(char_slice("Mike lives in America.", 15, 22), Some("merica."));
        assert_eq!(char_slice("张三住在北京。", 4, 6), Some("北京"));
        assert_eq!(char_slice("abc", 0, 3), Some("abc"));
    }

    #[test]
    fn char_slice_rejects_bad_ranges() {
        assert_eq!(char_slice("abc", 2, 2), None);
        assert_eq!(char_slice("abc", 2, 4), None);
        assert_eq!(char_slice("abc", -1, 2), None);
    }
}
