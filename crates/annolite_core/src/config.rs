//! Explicit configuration objects.
//!
//! # Responsibility
//! - Carry every on-disk location the core touches, so no operation reads
//!   process-global state.
//!
//! # Invariants
//! - `ImageLabelConfig::image_dir` is an existing directory at construction
//!   time; the JSONL file may not exist yet.

use crate::model::project::ProjectId;
use crate::model::EntityRef;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::record_service::record_file_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DB_FILE_NAME: &str = "annolite.db";
const DATA_DIR_NAME: &str = "data";
const EXPORT_DIR_NAME: &str = "exports";

/// Locations used by the annotation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Per-project folders and append-only record files.
    pub data_dir: PathBuf,
    /// Export output directory.
    pub export_dir: PathBuf,
}

impl CoreConfig {
    /// Lays out `annolite.db`, `data/` and `exports/` under `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            db_path: root.join(DB_FILE_NAME),
            data_dir: root.join(DATA_DIR_NAME),
            export_dir: root.join(EXPORT_DIR_NAME),
        }
    }

    /// Folder holding a project's on-disk data.
    pub fn project_dir(&self, folder_name: &str) -> PathBuf {
        self.data_dir.join(folder_name)
    }

    /// Append-only JSONL record file for a project id.
    pub fn record_path(&self, project_id: ProjectId) -> PathBuf {
        record_file_path(&self.data_dir, project_id)
    }
}

/// Locations used by the image-labeling flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLabelConfig {
    image_dir: PathBuf,
    jsonl_path: PathBuf,
}

impl ImageLabelConfig {
    /// Builds a config, rejecting a missing image directory.
    pub fn new(
        image_dir: impl Into<PathBuf>,
        jsonl_path: impl Into<PathBuf>,
    ) -> ServiceResult<Self> {
        let image_dir = image_dir.into();
        if !image_dir.is_dir() {
            return Err(ServiceError::NotFound(EntityRef::ImageDir(image_dir)));
        }
        Ok(Self {
            image_dir,
            jsonl_path: jsonl_path.into(),
        })
    }

    /// Defaults used by the labeling tool: `<root>/pretrain_images` and
    /// `<root>/pretrain_data.jsonl`. The directory is not checked.
    pub fn unchecked_defaults(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            image_dir: root.join("pretrain_images"),
            jsonl_path: root.join("pretrain_data.jsonl"),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }
}
