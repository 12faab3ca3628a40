//! Bulk load/save of a project's annotation graph for buffered editors.
//!
//! # Responsibility
//! - Materialize a project with all documents, spans and relations.
//! - Reconcile a client-side graph back into storage in one transaction.
//!
//! # Invariants
//! - Save is a destructive overwrite per document: existing relations and
//!   spans are deleted and replaced, never merged.
//! - Payload span ids are lookup keys into the freshly assigned id space;
//!   relations whose endpoints are not in that map are dropped silently.
//! - Only span ranges are checked on save. Labels, relation types and
//!   overlap are the editor's call, so orphaned or overlapping spans that
//!   were loaded save back unchanged.
//! - Any failure rolls the whole save back.

use crate::model::document::{DocumentId, NewDocument, STATUS_PENDING};
use crate::model::project::{Project, ProjectId};
use crate::model::span::SpanId;
use crate::model::validation::{check_range, normalize_project_name, ValidationError};
use crate::model::EntityRef;
use crate::repo::cascade::{self, DeletionScope};
use crate::repo::document_repo::{DocumentPage, DocumentRepository, SqliteDocumentRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::relation_repo::{RelationRepository, SqliteRelationRepository};
use crate::repo::span_repo::{SpanRepository, SqliteSpanRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::logged;
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Project metadata in a sync payload. Absent fields are left untouched on
/// save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_overlap: Option<bool>,
}

impl From<&Project> for ProjectMeta {
    fn from(project: &Project) -> Self {
        Self {
            name: Some(project.name.clone()),
            labels: Some(project.labels.clone()),
            relation_types: Some(project.relation_types.clone()),
            allow_overlap: Some(project.allow_overlap),
        }
    }
}

/// Span as exchanged with editors; `id` is only meaningful within the
/// payload on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEntry {
    pub id: i64,
    pub start: i64,
    pub end: i64,
    pub label: String,
}

/// Relation between two payload span ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEntry {
    #[serde(rename = "fromId")]
    pub from_id: i64,
    #[serde(rename = "toId")]
    pub to_id: i64,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// One document with its spans and relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentGraph {
    /// Positive id of an existing document of the project to update in
    /// place; anything else inserts a new document.
    #[serde(default)]
    pub id: Option<DocumentId>,
    pub text: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub spans: Vec<SpanEntry>,
    #[serde(default)]
    pub relations: Vec<RelationEntry>,
}

/// Full project graph, as returned by load and accepted by save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentGraph>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDocument {
    pub id: DocumentId,
    pub status: String,
}

/// Save acknowledgement, documents in payload order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub status: String,
    pub documents: Vec<SavedDocument>,
}

/// Sync service bound to one open connection.
pub struct SyncService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SyncService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Loads the whole graph of a project.
    ///
    /// Relations whose endpoints no longer exist are omitted.
    pub fn load_project_data(&self, project_id: ProjectId) -> ServiceResult<ProjectGraph> {
        let project = SqliteProjectRepository::new(self.conn)
            .get_project(project_id)?
            .ok_or(ServiceError::NotFound(EntityRef::Project(project_id)))?;

        let spans_repo = SqliteSpanRepository::new(self.conn);
        let relations_repo = SqliteRelationRepository::new(self.conn);
        let documents = SqliteDocumentRepository::new(self.conn)
            .list_documents(project_id, DocumentPage::default())?;

        let mut graphs = Vec::with_capacity(documents.len());
        for document in documents {
            let spans = spans_repo.list_spans(document.id)?;
            let known: HashSet<SpanId> = spans.iter().map(|span| span.id).collect();
            let relations = relations_repo
                .list_relations(document.id)?
                .into_iter()
                .filter(|relation| known.contains(&relation.from_id) && known.contains(&relation.to_id))
                .map(|relation| RelationEntry {
                    from_id: relation.from_id,
                    to_id: relation.to_id,
                    relation_type: relation.relation_type,
                })
                .collect();

            graphs.push(DocumentGraph {
                id: Some(document.id),
                text: document.text,
                status: document.status,
                spans: spans
                    .into_iter()
                    .map(|span| SpanEntry {
                        id: span.id,
                        start: span.start,
                        end: span.end,
                        label: span.label,
                    })
                    .collect(),
                relations,
            });
        }

        debug!(
            "event=project_sync_load module=sync status=ok project_id={project_id} documents={}",
            graphs.len()
        );
        Ok(ProjectGraph {
            project: Some(ProjectMeta::from(&project)),
            documents: Some(graphs),
        })
    }

    /// Reconciles `graph` into storage in a single transaction.
    pub fn save_project_data(
        &self,
        project_id: ProjectId,
        graph: &ProjectGraph,
    ) -> ServiceResult<SaveSummary> {
        logged("project_sync_save", self.save_project_data_inner(project_id, graph))
    }

    fn save_project_data_inner(
        &self,
        project_id: ProjectId,
        graph: &ProjectGraph,
    ) -> ServiceResult<SaveSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let projects = SqliteProjectRepository::new(&tx);
        let project = projects
            .get_project(project_id)?
            .ok_or(ServiceError::NotFound(EntityRef::Project(project_id)))?;

        if let Some(meta) = &graph.project {
            apply_project_meta(&projects, &project, meta)?;
        }

        let mut saved = Vec::new();
        let mut dropped_relations = 0usize;
        for entry in graph.documents.iter().flatten() {
            let doc_id = upsert_document(&tx, project_id, entry)?;
            cascade::execute(&tx, DeletionScope::DocumentContent(doc_id))?;
            dropped_relations += replace_document_content(&tx, doc_id, entry)?;
            saved.push(SavedDocument {
                id: doc_id,
                status: "saved".to_string(),
            });
        }
        tx.commit()?;

        info!(
            "event=project_sync_save module=sync status=ok project_id={project_id} documents={} dropped_relations={dropped_relations}",
            saved.len()
        );
        Ok(SaveSummary {
            status: "ok".to_string(),
            documents: saved,
        })
    }
}

fn apply_project_meta(
    projects: &SqliteProjectRepository<'_>,
    project: &Project,
    meta: &ProjectMeta,
) -> ServiceResult<()> {
    if let Some(name) = &meta.name {
        let name = normalize_project_name(name)?;
        if name != project.name {
            if projects.find_project_by_name(&name)?.is_some() {
                return Err(ValidationError::NameConflict(name).into());
            }
            projects.rename_project(project.id, &name)?;
        }
    }
    if let Some(labels) = &meta.labels {
        projects.update_labels(project.id, labels)?;
    }
    if let Some(relation_types) = &meta.relation_types {
        projects.update_relation_types(project.id, relation_types)?;
    }
    if let Some(allow_overlap) = meta.allow_overlap {
        projects.update_allow_overlap(project.id, allow_overlap)?;
    }
    Ok(())
}

/// Updates the matching document of the project in place, or inserts a new
/// one. Returns the persisted id.
fn upsert_document(
    conn: &Connection,
    project_id: ProjectId,
    entry: &DocumentGraph,
) -> ServiceResult<DocumentId> {
    let documents = SqliteDocumentRepository::new(conn);
    let existing = match entry.id.filter(|id| *id > 0) {
        Some(id) => documents
            .get_document(id)?
            .filter(|document| document.project_id == project_id),
        None => None,
    };

    match existing {
        Some(document) => {
            let status = entry.status.as_deref().or(document.status.as_deref());
            documents.update_text_and_status(document.id, &entry.text, status)?;
            Ok(document.id)
        }
        None => {
            let created = documents.insert_document(
                project_id,
                &NewDocument {
                    text: entry.text.clone(),
                    status: Some(
                        entry
                            .status
                            .clone()
                            .unwrap_or_else(|| STATUS_PENDING.to_string()),
                    ),
                    ..NewDocument::default()
                },
            )?;
            Ok(created.id)
        }
    }
}

/// Inserts spans then relations for one document. Returns how many
/// relations were dropped for referencing unknown payload span ids.
fn replace_document_content(
    conn: &Connection,
    doc_id: DocumentId,
    entry: &DocumentGraph,
) -> ServiceResult<usize> {
    let spans_repo = SqliteSpanRepository::new(conn);
    let relations_repo = SqliteRelationRepository::new(conn);
    let text_len = entry.text.chars().count() as i64;

    let mut id_map: HashMap<i64, SpanId> = HashMap::with_capacity(entry.spans.len());
    for span in &entry.spans {
        check_range(span.start, span.end, text_len)?;
        let row = spans_repo.insert_span(doc_id, span.start, span.end, &span.label)?;
        id_map.insert(span.id, row.id);
    }

    let mut dropped = 0;
    let mut seen: HashSet<(SpanId, SpanId, &str)> = HashSet::new();
    for relation in &entry.relations {
        let (Some(&from_id), Some(&to_id)) =
            (id_map.get(&relation.from_id), id_map.get(&relation.to_id))
        else {
            dropped += 1;
            continue;
        };
        if !seen.insert((from_id, to_id, relation.relation_type.as_str())) {
            return Err(ValidationError::DuplicateRelation {
                from_id,
                to_id,
                relation_type: relation.relation_type.clone(),
            }
            .into());
        }
        relations_repo.insert_relation(doc_id, from_id, to_id, &relation.relation_type)?;
    }
    Ok(dropped)
}
