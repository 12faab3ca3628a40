//! Span repository contract and SQLite implementation.
//!
//! # Invariants
//! - Listing order is `start ASC, end ASC, id ASC` so exports are stable.

use crate::model::document::DocumentId;
use crate::model::span::{Span, SpanId};
use crate::model::EntityRef;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const SPAN_SELECT_SQL: &str = "SELECT
    id,
    doc_id,
    start,
    \"end\",
    label,
    created_at
FROM annotations";

/// Repository interface for annotation (span) rows.
pub trait SpanRepository {
    fn insert_span(&self, doc_id: DocumentId, start: i64, end: i64, label: &str)
        -> RepoResult<Span>;
    fn get_span(&self, id: SpanId) -> RepoResult<Option<Span>>;
    fn list_spans(&self, doc_id: DocumentId) -> RepoResult<Vec<Span>>;
    fn update_span(&self, id: SpanId, start: i64, end: i64, label: &str) -> RepoResult<()>;
}

/// SQLite-backed span repository.
pub struct SqliteSpanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSpanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SpanRepository for SqliteSpanRepository<'_> {
    fn insert_span(
        &self,
        doc_id: DocumentId,
        start: i64,
        end: i64,
        label: &str,
    ) -> RepoResult<Span> {
        self.conn.execute(
            "INSERT INTO annotations (doc_id, start, \"end\", label) VALUES (?1, ?2, ?3, ?4);",
            params![doc_id, start, end, label],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_span(id)?
            .ok_or(RepoError::NotFound(EntityRef::Span(id)))
    }

    fn get_span(&self, id: SpanId) -> RepoResult<Option<Span>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SPAN_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_span_row(row)?));
        }
        Ok(None)
    }

    fn list_spans(&self, doc_id: DocumentId) -> RepoResult<Vec<Span>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SPAN_SELECT_SQL} WHERE doc_id = ?1 ORDER BY start ASC, \"end\" ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([doc_id])?;
        let mut spans = Vec::new();
        while let Some(row) = rows.next()? {
            spans.push(parse_span_row(row)?);
        }
        Ok(spans)
    }

    fn update_span(&self, id: SpanId, start: i64, end: i64, label: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE annotations SET start = ?2, \"end\" = ?3, label = ?4 WHERE id = ?1;",
            params![id, start, end, label],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Span(id)));
        }
        Ok(())
    }
}

fn parse_span_row(row: &Row<'_>) -> RepoResult<Span> {
    Ok(Span {
        id: row.get("id")?,
        doc_id: row.get("doc_id")?,
        start: row.get("start")?,
        end: row.get("end")?,
        label: row.get("label")?,
        created_at: row.get("created_at")?,
    })
}
