//! Project record and label-set membership helpers.

use serde::{Deserialize, Serialize};

pub type ProjectId = i64;

/// Annotation project: the owner of documents and of the label and
/// relation-type vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique across the store.
    pub name: String,
    /// Ordered allowed span labels.
    pub labels: Vec<String>,
    /// Ordered allowed relation types.
    pub relation_types: Vec<String>,
    /// When `false`, spans inside one document must not share characters.
    pub allow_overlap: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Project {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|value| value == label)
    }

    pub fn has_relation_type(&self, relation_type: &str) -> bool {
        self.relation_types.iter().any(|value| value == relation_type)
    }

    /// Folder name used for the project's on-disk data.
    ///
    /// Keeps alphanumerics, spaces, `-` and `_`, then trims.
    pub fn folder_name(&self) -> String {
        sanitize_folder_name(&self.name)
    }
}

/// Insert model for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub allow_overlap: bool,
}

impl NewProject {
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            labels,
            ..Self::default()
        }
    }

    pub fn with_relation_types(mut self, relation_types: Vec<String>) -> Self {
        self.relation_types = relation_types;
        self
    }

    pub fn with_allow_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = allow_overlap;
        self
    }
}

pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::sanitize_folder_name;

    #[test]
    fn folder_name_drops_path_characters() {
        assert_eq!(sanitize_folder_name(" ../Demo: v2/ "), "Demo v2");
        assert_eq!(sanitize_folder_name("人名_标注-1"), "人名_标注-1");
    }
}
