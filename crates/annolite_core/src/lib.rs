//! Core of the annolite annotation store.
//! This crate is the single source of truth for span and relation invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod workspace;

pub use config::{CoreConfig, ImageLabelConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{Document, DocumentId, NewDocument};
pub use model::project::{NewProject, Project, ProjectId};
pub use model::relation::{Relation, RelationId};
pub use model::span::{Span, SpanId};
pub use model::validation::ValidationError;
pub use model::EntityRef;
pub use repo::{RepoError, RepoResult};
pub use service::error::{ServiceError, ServiceResult};
pub use service::export_service::ExportFormat;
pub use service::import_service::{ImportOptions, SplitStrategy};
pub use service::record_service::{ImageLabel, ImageListing};
pub use service::sync_service::{
    DocumentGraph, ProjectGraph, ProjectMeta, RelationEntry, SaveSummary, SpanEntry,
};
pub use workspace::Workspace;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
