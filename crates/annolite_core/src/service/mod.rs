//! Core use-case services.
//!
//! # Responsibility
//! - Enforce every write-time invariant before mutating storage.
//! - Keep callers (CLI, HTTP glue) decoupled from SQL and file layout.
//!
//! # Invariants
//! - Validation runs before any mutation; multi-row writes run in one
//!   transaction, so a failed call leaves no partial state.
//! - Services borrow a connection; they never open or cache one.

pub mod document_service;
pub mod error;
pub mod export_service;
pub mod import_service;
pub mod project_service;
pub mod record_service;
pub mod relation_service;
pub mod span_service;
pub mod sync_service;

use crate::model::document::{Document, DocumentId};
use crate::model::project::Project;
use crate::model::EntityRef;
use crate::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use error::{ServiceError, ServiceResult};
use log::warn;
use rusqlite::Connection;

/// Loads a document and its owning project, failing with `NotFound` on
/// either.
pub(crate) fn load_document_scope(
    conn: &Connection,
    doc_id: DocumentId,
) -> ServiceResult<(Document, Project)> {
    let document = SqliteDocumentRepository::new(conn)
        .get_document(doc_id)?
        .ok_or(ServiceError::NotFound(EntityRef::Document(doc_id)))?;
    let project = SqliteProjectRepository::new(conn)
        .get_project(document.project_id)?
        .ok_or(ServiceError::NotFound(EntityRef::Project(document.project_id)))?;
    Ok((document, project))
}

/// Logs a failed call with its stable error code and passes the result on.
pub(crate) fn logged<T>(event: &str, result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(err) = &result {
        warn!(
            "event={event} module=service status=error error_code={} error={err}",
            err.code()
        );
    }
    result
}
