//! Error taxonomy shared by all use-case services.
//!
//! - `NotFound`: a referenced project/document/span/relation/file is absent.
//! - `Validation`: a write-time rule rejected the input before any mutation.
//! - `UnsupportedFormat` / `UnsupportedStrategy` / `UnknownEncoding`:
//!   caller-supplied option names that do not parse.
//! - Everything else is a storage failure.

use crate::model::validation::ValidationError;
use crate::model::EntityRef;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    NotFound(EntityRef),
    Validation(ValidationError),
    UnsupportedFormat(String),
    UnsupportedStrategy(String),
    UnknownEncoding(String),
    /// File bytes are not valid in the chosen encoding.
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Csv(csv::Error),
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(ValidationError::EmptyName) => "empty_name",
            Self::Validation(ValidationError::NameConflict(_)) => "name_conflict",
            Self::Validation(ValidationError::InvalidLabel(_)) => "invalid_label",
            Self::Validation(ValidationError::InvalidRange { .. }) => "invalid_range",
            Self::Validation(ValidationError::OverlapConflict { .. }) => "overlap_conflict",
            Self::Validation(ValidationError::EndpointMismatch { .. }) => "endpoint_mismatch",
            Self::Validation(ValidationError::InvalidType(_)) => "invalid_type",
            Self::Validation(ValidationError::DuplicateRelation { .. }) => "duplicate_relation",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::UnsupportedStrategy(_) => "unsupported_strategy",
            Self::UnknownEncoding(_) => "unknown_encoding",
            Self::Decode { .. } => "decode_failed",
            Self::Io { .. } => "io_failed",
            Self::Json(_) => "json_failed",
            Self::Csv(_) => "csv_failed",
            Self::Repo(_) => "storage_failed",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnsupportedFormat(format) => write!(f, "unsupported export format `{format}`"),
            Self::UnsupportedStrategy(strategy) => {
                write!(f, "unsupported split strategy `{strategy}`")
            }
            Self::UnknownEncoding(label) => write!(f, "unknown text encoding `{label}`"),
            Self::Decode { path, encoding } => write!(
                f,
                "cannot decode `{}` as {encoding}",
                path.display()
            ),
            Self::Io { path, source } => write!(f, "I/O error on `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<crate::db::DbError> for ServiceError {
    fn from(value: crate::db::DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<csv::Error> for ServiceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
