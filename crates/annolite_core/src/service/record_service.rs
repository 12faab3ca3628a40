//! Append-only JSONL records, independent of the relational store.
//!
//! # Responsibility
//! - Append arbitrary JSON values to a per-project record file.
//! - Save image-labeling conversations and report labeling progress.
//!
//! # Invariants
//! - Files are only ever appended to, one compact JSON object per line.
//! - Image lookups never resolve outside the configured image directory.

use crate::config::ImageLabelConfig;
use crate::model::project::ProjectId;
use crate::model::EntityRef;
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

const IMAGE_TAG: &str = "<image>";
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Record file path for a project under `data_dir`.
pub fn record_file_path(data_dir: &Path, project_id: ProjectId) -> PathBuf {
    data_dir.join(format!("project_{project_id}_annotations.jsonl"))
}

/// Appends `value` as one line to the project's record file, creating the
/// data directory when needed. Returns the file path.
pub fn append_record(
    data_dir: &Path,
    project_id: ProjectId,
    value: &Value,
) -> ServiceResult<PathBuf> {
    fs::create_dir_all(data_dir).map_err(|err| ServiceError::io(data_dir, err))?;
    let path = record_file_path(data_dir, project_id);
    append_json_line(&path, value)?;
    debug!("event=record_append module=record status=ok project_id={project_id}");
    Ok(path)
}

/// One labeled image as submitted by the labeling UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLabel {
    pub image: String,
    pub user_content: String,
    pub assistant_content: String,
}

impl ImageLabel {
    /// Conversation record in the training-data layout.
    pub fn to_record(&self) -> Value {
        let mut user_text = self.user_content.trim().to_string();
        if !user_text.ends_with(IMAGE_TAG) {
            user_text = format!("{user_text}\n{IMAGE_TAG}");
        }
        json!({
            "conversations": [
                {"role": "user", "content": user_text},
                {"role": "assistant", "content": self.assistant_content},
            ],
            "image": self.image,
        })
    }
}

/// Appends `label` to the configured JSONL file.
pub fn save_image_label(config: &ImageLabelConfig, label: &ImageLabel) -> ServiceResult<()> {
    if let Some(parent) = config.jsonl_path().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| ServiceError::io(parent, err))?;
        }
    }
    append_json_line(config.jsonl_path(), &label.to_record())?;
    info!("event=image_label_save module=record status=ok");
    Ok(())
}

/// Images on disk and the subset already labeled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageListing {
    pub images: Vec<String>,
    pub labeled: Vec<String>,
}

/// Lists image files in the configured directory, sorted by name, with the
/// sorted set of image names already present in the JSONL file.
pub fn list_images(config: &ImageLabelConfig) -> ServiceResult<ImageListing> {
    let image_dir = config.image_dir();
    let entries = match fs::read_dir(image_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ImageListing::default()),
        Err(err) => return Err(ServiceError::io(image_dir, err)),
    };

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ServiceError::io(image_dir, err))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_image_name(&name) {
            images.push(name);
        }
    }
    images.sort();

    let labeled = read_labeled_images(config.jsonl_path())?;
    Ok(ImageListing {
        images,
        labeled: labeled.into_iter().collect(),
    })
}

/// Resolves `filename` inside the image directory.
///
/// Names carrying a path separator or `..` are treated as absent.
pub fn image_path(config: &ImageLabelConfig, filename: &str) -> ServiceResult<PathBuf> {
    let not_found = || ServiceError::NotFound(EntityRef::Image(filename.to_string()));
    if filename.is_empty()
        || filename.contains(['/', '\\'])
        || filename == "."
        || filename.contains("..")
    {
        return Err(not_found());
    }
    let path = config.image_dir().join(filename);
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}

fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn read_labeled_images(jsonl_path: &Path) -> ServiceResult<BTreeSet<String>> {
    let file = match fs::File::open(jsonl_path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => return Err(ServiceError::io(jsonl_path, err)),
    };

    let mut labeled = BTreeSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|err| ServiceError::io(jsonl_path, err))?;
        let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
            continue;
        };
        if let Some(image) = value.get("image").and_then(Value::as_str) {
            labeled.insert(image.to_string());
        }
    }
    Ok(labeled)
}

fn append_json_line(path: &Path, value: &Value) -> ServiceResult<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| ServiceError::io(path, err))?;
    file.write_all(line.as_bytes())
        .map_err(|err| ServiceError::io(path, err))
}
