//! Document repository contract and SQLite implementation.
//!
//! # Invariants
//! - Listing order is `id ASC`, which is also import order.
//! - `text` is only replaced through bulk sync, which rewrites all spans of
//!   the document in the same transaction.

use crate::model::document::{Document, DocumentId, NewDocument};
use crate::model::project::ProjectId;
use crate::model::EntityRef;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    text,
    status,
    source_file,
    unit_index,
    created_at
FROM documents";

/// Page options for listing documents of one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentPage {
    /// `None` returns every remaining row.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for document rows.
pub trait DocumentRepository {
    fn insert_document(&self, project_id: ProjectId, document: &NewDocument)
        -> RepoResult<Document>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    fn list_documents(&self, project_id: ProjectId, page: DocumentPage)
        -> RepoResult<Vec<Document>>;
    fn update_text_and_status(
        &self,
        id: DocumentId,
        text: &str,
        status: Option<&str>,
    ) -> RepoResult<()>;
    fn update_status(&self, id: DocumentId, status: &str) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn insert_document(
        &self,
        project_id: ProjectId,
        document: &NewDocument,
    ) -> RepoResult<Document> {
        self.conn.execute(
            "INSERT INTO documents (project_id, text, status, source_file, unit_index)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                project_id,
                document.text.as_str(),
                document.status.as_deref(),
                document.source_file.as_deref(),
                document.unit_index,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_document(id)?
            .ok_or(RepoError::NotFound(EntityRef::Document(id)))
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn list_documents(
        &self,
        project_id: ProjectId,
        page: DocumentPage,
    ) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE project_id = ? ORDER BY id ASC");
        let mut bind_values = vec![Value::Integer(project_id)];

        if let Some(limit) = page.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if page.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(page.offset)));
            }
        } else if page.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(page.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn update_text_and_status(
        &self,
        id: DocumentId,
        text: &str,
        status: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents SET text = ?2, status = ?3 WHERE id = ?1;",
            params![id, text, status],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Document(id)));
        }
        Ok(())
    }

    fn update_status(&self, id: DocumentId, status: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents SET status = ?2 WHERE id = ?1;",
            params![id, status],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Document(id)));
        }
        Ok(())
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    Ok(Document {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        text: row.get("text")?,
        status: row.get("status")?,
        source_file: row.get("source_file")?,
        unit_index: row.get("unit_index")?,
        created_at: row.get("created_at")?,
    })
}
