//! Per-call facade over every core operation.
//!
//! # Responsibility
//! - Hold the explicit `CoreConfig` for one annotation store.
//! - Open a connection for each call and release it on every exit path.
//!
//! # Invariants
//! - No connection outlives the method that opened it.
//! - The database parent directory is created on first use.

use crate::config::CoreConfig;
use crate::db::open_db;
use crate::model::document::{Document, DocumentId};
use crate::model::project::{NewProject, Project, ProjectId};
use crate::model::relation::{Relation, RelationId};
use crate::model::span::{Span, SpanId};
use crate::service::document_service::DocumentService;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::export_service::ExportService;
use crate::service::import_service::{ImportOptions, ImportService};
use crate::service::project_service::ProjectService;
use crate::service::record_service;
use crate::service::relation_service::RelationService;
use crate::service::span_service::SpanService;
use crate::service::sync_service::{ProjectGraph, SaveSummary, SyncService};
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Annotation store rooted at one `CoreConfig`.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: CoreConfig,
}

impl Workspace {
    pub fn new(config: CoreConfig) -> Self {
        Self { config }
    }

    /// Store laid out under `root` (see `CoreConfig::from_root`).
    pub fn at_root(root: impl AsRef<Path>) -> Self {
        Self::new(CoreConfig::from_root(root))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> ServiceResult<T>) -> ServiceResult<T> {
        if let Some(parent) = self.config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| ServiceError::io(parent, err))?;
            }
        }
        let conn = open_db(&self.config.db_path)?;
        f(&conn)
    }

    // Projects

    pub fn create_project(&self, project: NewProject) -> ServiceResult<Project> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).create_project(project))
    }

    pub fn ensure_project(&self, project: NewProject) -> ServiceResult<Project> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).ensure_project(project))
    }

    pub fn get_project(&self, id: ProjectId) -> ServiceResult<Project> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).get_project(id))
    }

    pub fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).list_projects())
    }

    pub fn get_project_id_by_name(&self, name: &str) -> ServiceResult<Option<ProjectId>> {
        self.with_connection(|conn| {
            ProjectService::new(conn, &self.config).get_project_id_by_name(name)
        })
    }

    pub fn update_labels(&self, id: ProjectId, labels: Vec<String>) -> ServiceResult<Project> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).update_labels(id, labels))
    }

    pub fn update_relation_types(
        &self,
        id: ProjectId,
        relation_types: Vec<String>,
    ) -> ServiceResult<Project> {
        self.with_connection(|conn| {
            ProjectService::new(conn, &self.config).update_relation_types(id, relation_types)
        })
    }

    pub fn update_allow_overlap(&self, id: ProjectId, allow_overlap: bool) -> ServiceResult<Project> {
        self.with_connection(|conn| {
            ProjectService::new(conn, &self.config).update_allow_overlap(id, allow_overlap)
        })
    }

    pub fn delete_project(&self, id: ProjectId) -> ServiceResult<bool> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).delete_project(id))
    }

    pub fn clear_project(&self, id: ProjectId) -> ServiceResult<bool> {
        self.with_connection(|conn| ProjectService::new(conn, &self.config).clear_project(id))
    }

    // Documents

    pub fn import_texts(&self, project_id: ProjectId, texts: Vec<String>) -> ServiceResult<Vec<Document>> {
        self.with_connection(|conn| DocumentService::new(conn).import_texts(project_id, texts))
    }

    pub fn import_txt_files<P: AsRef<Path>>(
        &self,
        project_id: ProjectId,
        paths: &[P],
        options: &ImportOptions,
    ) -> ServiceResult<Vec<Document>> {
        self.with_connection(|conn| {
            ImportService::new(conn).import_txt_files(project_id, paths, options)
        })
    }

    pub fn list_documents(
        &self,
        project_id: ProjectId,
        limit: Option<u32>,
        offset: u32,
    ) -> ServiceResult<Vec<Document>> {
        self.with_connection(|conn| {
            DocumentService::new(conn).list_documents(project_id, limit, offset)
        })
    }

    pub fn get_document(&self, id: DocumentId) -> ServiceResult<Document> {
        self.with_connection(|conn| DocumentService::new(conn).get_document(id))
    }

    pub fn update_document_status(&self, id: DocumentId, status: &str) -> ServiceResult<Document> {
        self.with_connection(|conn| DocumentService::new(conn).update_document_status(id, status))
    }

    pub fn delete_document(&self, id: DocumentId) -> ServiceResult<bool> {
        self.with_connection(|conn| DocumentService::new(conn).delete_document(id))
    }

    // Spans

    pub fn list_spans(&self, doc_id: DocumentId) -> ServiceResult<Vec<Span>> {
        self.with_connection(|conn| SpanService::new(conn).list_spans(doc_id))
    }

    pub fn add_span(&self, doc_id: DocumentId, start: i64, end: i64, label: &str) -> ServiceResult<Span> {
        self.with_connection(|conn| SpanService::new(conn).add_span(doc_id, start, end, label))
    }

    pub fn update_span(&self, id: SpanId, start: i64, end: i64, label: &str) -> ServiceResult<Span> {
        self.with_connection(|conn| SpanService::new(conn).update_span(id, start, end, label))
    }

    pub fn delete_span(&self, id: SpanId) -> ServiceResult<bool> {
        self.with_connection(|conn| SpanService::new(conn).delete_span(id))
    }

    // Relations

    pub fn list_relations(&self, doc_id: DocumentId) -> ServiceResult<Vec<Relation>> {
        self.with_connection(|conn| RelationService::new(conn).list_relations(doc_id))
    }

    pub fn add_relation(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> ServiceResult<Relation> {
        self.with_connection(|conn| {
            RelationService::new(conn).add_relation(doc_id, from_id, to_id, relation_type)
        })
    }

    pub fn update_relation_type(&self, id: RelationId, relation_type: &str) -> ServiceResult<Relation> {
        self.with_connection(|conn| RelationService::new(conn).update_relation_type(id, relation_type))
    }

    pub fn delete_relation(&self, id: RelationId) -> ServiceResult<bool> {
        self.with_connection(|conn| RelationService::new(conn).delete_relation(id))
    }

    // Sync and export

    pub fn load_project_data(&self, project_id: ProjectId) -> ServiceResult<ProjectGraph> {
        self.with_connection(|conn| SyncService::new(conn).load_project_data(project_id))
    }

    pub fn save_project_data(
        &self,
        project_id: ProjectId,
        graph: &ProjectGraph,
    ) -> ServiceResult<SaveSummary> {
        self.with_connection(|conn| SyncService::new(conn).save_project_data(project_id, graph))
    }

    pub fn export_project(
        &self,
        project_id: ProjectId,
        format: &str,
        doc_ids: Option<&[DocumentId]>,
    ) -> ServiceResult<PathBuf> {
        self.with_connection(|conn| {
            ExportService::new(conn, &self.config).export_project(project_id, format, doc_ids)
        })
    }

    // Records never touch the database.

    pub fn append_record(&self, project_id: ProjectId, value: &Value) -> ServiceResult<PathBuf> {
        record_service::append_record(&self.config.data_dir, project_id, value)
    }
}
