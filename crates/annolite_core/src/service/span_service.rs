//! Span (annotation) use-case service.
//!
//! # Responsibility
//! - Validate and persist character-offset spans.
//!
//! # Invariants
//! - Checks run in order: document/project exist, label, range, overlap.
//! - Update re-runs the same checks, excluding the span being updated from
//!   the overlap scan.
//! - Delete is idempotent and also removes relations touching the span.

use crate::model::document::DocumentId;
use crate::model::span::{Span, SpanId};
use crate::model::validation::validate_span;
use crate::model::EntityRef;
use crate::repo::cascade::{self, DeletionScope};
use crate::repo::span_repo::{SpanRepository, SqliteSpanRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{load_document_scope, logged};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Span service bound to one open connection.
pub struct SpanService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SpanService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists spans of a document ordered by `start, end`.
    pub fn list_spans(&self, doc_id: DocumentId) -> ServiceResult<Vec<Span>> {
        Ok(SqliteSpanRepository::new(self.conn).list_spans(doc_id)?)
    }

    pub fn get_span(&self, id: SpanId) -> ServiceResult<Span> {
        SqliteSpanRepository::new(self.conn)
            .get_span(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Span(id)))
    }

    /// Adds a span after label, range and overlap validation.
    pub fn add_span(
        &self,
        doc_id: DocumentId,
        start: i64,
        end: i64,
        label: &str,
    ) -> ServiceResult<Span> {
        logged("span_add", self.add_span_inner(doc_id, start, end, label))
    }

    fn add_span_inner(
        &self,
        doc_id: DocumentId,
        start: i64,
        end: i64,
        label: &str,
    ) -> ServiceResult<Span> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (document, project) = load_document_scope(&tx, doc_id)?;
        let repo = SqliteSpanRepository::new(&tx);
        let existing = repo.list_spans(doc_id)?;
        validate_span(
            &project,
            document.char_len(),
            start,
            end,
            label,
            &existing,
            None,
        )?;

        let span = repo.insert_span(doc_id, start, end, label)?;
        tx.commit()?;

        info!(
            "event=span_add module=service status=ok doc_id={doc_id} span_id={} start={start} end={end}",
            span.id
        );
        Ok(span)
    }

    /// Moves and/or relabels a span, re-running every span check.
    pub fn update_span(&self, id: SpanId, start: i64, end: i64, label: &str) -> ServiceResult<Span> {
        logged("span_update", self.update_span_inner(id, start, end, label))
    }

    fn update_span_inner(
        &self,
        id: SpanId,
        start: i64,
        end: i64,
        label: &str,
    ) -> ServiceResult<Span> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let repo = SqliteSpanRepository::new(&tx);
        let current = repo
            .get_span(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Span(id)))?;
        let (document, project) = load_document_scope(&tx, current.doc_id)?;
        let existing = repo.list_spans(current.doc_id)?;
        validate_span(
            &project,
            document.char_len(),
            start,
            end,
            label,
            &existing,
            Some(id),
        )?;

        repo.update_span(id, start, end, label)?;
        let updated = repo
            .get_span(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Span(id)))?;
        tx.commit()?;

        info!(
            "event=span_update module=service status=ok doc_id={} span_id={id} start={start} end={end}",
            updated.doc_id
        );
        Ok(updated)
    }

    /// Deletes a span and the relations referencing it.
    ///
    /// Returns `false` when no span with `id` existed.
    pub fn delete_span(&self, id: SpanId) -> ServiceResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let report = cascade::execute(&tx, DeletionScope::Span(id))?;
        tx.commit()?;

        info!(
            "event=span_delete module=service status=ok span_id={id} deleted={} relations={}",
            report.annotations, report.relations
        );
        Ok(report.annotations > 0)
    }
}
