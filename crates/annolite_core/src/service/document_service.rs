//! Document use-case service.
//!
//! # Invariants
//! - Documents are always created under an existing project.
//! - Deleting a document removes its relations and spans first.

use crate::model::document::{Document, DocumentId, NewDocument};
use crate::model::project::ProjectId;
use crate::model::EntityRef;
use crate::repo::cascade::{self, DeletionScope};
use crate::repo::document_repo::{DocumentPage, DocumentRepository, SqliteDocumentRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub const DOCUMENTS_DEFAULT_LIMIT: u32 = 50;

/// Document service bound to one open connection.
pub struct DocumentService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DocumentService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates one document per input string, in order, without status.
    pub fn import_texts<I, S>(&self, project_id: ProjectId, texts: I) -> ServiceResult<Vec<Document>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = texts
            .into_iter()
            .map(NewDocument::from_text)
            .collect::<Vec<_>>();
        self.insert_documents(project_id, &documents)
    }

    /// Inserts prepared documents in one transaction.
    pub(crate) fn insert_documents(
        &self,
        project_id: ProjectId,
        documents: &[NewDocument],
    ) -> ServiceResult<Vec<Document>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if SqliteProjectRepository::new(&tx).get_project(project_id)?.is_none() {
            return Err(ServiceError::NotFound(EntityRef::Project(project_id)));
        }

        let repo = SqliteDocumentRepository::new(&tx);
        let mut created = Vec::with_capacity(documents.len());
        for document in documents {
            created.push(repo.insert_document(project_id, document)?);
        }
        tx.commit()?;

        info!(
            "event=documents_import module=service status=ok project_id={project_id} count={}",
            created.len()
        );
        Ok(created)
    }

    /// Lists documents in id order. `limit` defaults to 50.
    pub fn list_documents(
        &self,
        project_id: ProjectId,
        limit: Option<u32>,
        offset: u32,
    ) -> ServiceResult<Vec<Document>> {
        let page = DocumentPage {
            limit: Some(limit.unwrap_or(DOCUMENTS_DEFAULT_LIMIT)),
            offset,
        };
        Ok(SqliteDocumentRepository::new(self.conn).list_documents(project_id, page)?)
    }

    pub fn get_document(&self, id: DocumentId) -> ServiceResult<Document> {
        SqliteDocumentRepository::new(self.conn)
            .get_document(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Document(id)))
    }

    pub fn update_document_status(&self, id: DocumentId, status: &str) -> ServiceResult<Document> {
        SqliteDocumentRepository::new(self.conn).update_status(id, status)?;
        self.get_document(id)
    }

    /// Deletes a document with its spans and relations.
    ///
    /// Returns `false` when the document did not exist.
    pub fn delete_document(&self, id: DocumentId) -> ServiceResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let report = cascade::execute(&tx, DeletionScope::Document(id))?;
        tx.commit()?;

        info!(
            "event=document_delete module=service status=ok doc_id={id} deleted={} annotations={} relations={}",
            report.documents, report.annotations, report.relations
        );
        Ok(report.documents > 0)
    }
}
