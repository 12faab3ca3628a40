//! Ordered deletion plans.
//!
//! # Responsibility
//! - Encode, in one place, which rows a scoped delete removes and in which
//!   order.
//!
//! # Invariants
//! - Every plan deletes relations, then annotations, then documents, then
//!   the project row. Foreign keys without `ON DELETE` actions make the
//!   store reject any other order.
//! - Plans never open their own transaction; callers pass a transaction when
//!   more than one step runs.

use crate::model::document::DocumentId;
use crate::model::project::ProjectId;
use crate::model::span::SpanId;
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Subtree selected for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionScope {
    /// One span plus relations touching it.
    Span(SpanId),
    /// Spans and relations of a document; the document row stays.
    DocumentContent(DocumentId),
    /// A document with its spans and relations.
    Document(DocumentId),
    /// Every document of a project; the project row stays.
    ProjectDocuments(ProjectId),
    /// A project and everything below it.
    Project(ProjectId),
}

/// Table touched by one deletion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Relations,
    Annotations,
    Documents,
    Projects,
}

/// One `DELETE` bound to the scope id as `?1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionStep {
    pub table: Table,
    pub sql: &'static str,
}

/// Row counts removed per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub relations: usize,
    pub annotations: usize,
    pub documents: usize,
    pub projects: usize,
}

impl DeletionReport {
    fn record(&mut self, table: Table, rows: usize) {
        match table {
            Table::Relations => self.relations += rows,
            Table::Annotations => self.annotations += rows,
            Table::Documents => self.documents += rows,
            Table::Projects => self.projects += rows,
        }
    }
}

const SPAN_PLAN: &[DeletionStep] = &[
    DeletionStep {
        table: Table::Relations,
        sql: "DELETE FROM relations WHERE from_ann_id = ?1 OR to_ann_id = ?1;",
    },
    DeletionStep {
        table: Table::Annotations,
        sql: "DELETE FROM annotations WHERE id = ?1;",
    },
];

const DOCUMENT_CONTENT_PLAN: &[DeletionStep] = &[
    DeletionStep {
        table: Table::Relations,
        sql: "DELETE FROM relations WHERE doc_id = ?1;",
    },
    DeletionStep {
        table: Table::Annotations,
        sql: "DELETE FROM annotations WHERE doc_id = ?1;",
    },
];

const DOCUMENT_PLAN: &[DeletionStep] = &[
    DOCUMENT_CONTENT_PLAN[0],
    DOCUMENT_CONTENT_PLAN[1],
    DeletionStep {
        table: Table::Documents,
        sql: "DELETE FROM documents WHERE id = ?1;",
    },
];

const PROJECT_DOCUMENTS_PLAN: &[DeletionStep] = &[
    DeletionStep {
        table: Table::Relations,
        sql: "DELETE FROM relations
              WHERE doc_id IN (SELECT id FROM documents WHERE project_id = ?1);",
    },
    DeletionStep {
        table: Table::Annotations,
        sql: "DELETE FROM annotations
              WHERE doc_id IN (SELECT id FROM documents WHERE project_id = ?1);",
    },
    DeletionStep {
        table: Table::Documents,
        sql: "DELETE FROM documents WHERE project_id = ?1;",
    },
];

const PROJECT_PLAN: &[DeletionStep] = &[
    PROJECT_DOCUMENTS_PLAN[0],
    PROJECT_DOCUMENTS_PLAN[1],
    PROJECT_DOCUMENTS_PLAN[2],
    DeletionStep {
        table: Table::Projects,
        sql: "DELETE FROM projects WHERE id = ?1;",
    },
];

impl DeletionScope {
    /// Steps for this scope, children first.
    pub fn plan(self) -> &'static [DeletionStep] {
        match self {
            Self::Span(_) => SPAN_PLAN,
            Self::DocumentContent(_) => DOCUMENT_CONTENT_PLAN,
            Self::Document(_) => DOCUMENT_PLAN,
            Self::ProjectDocuments(_) => PROJECT_DOCUMENTS_PLAN,
            Self::Project(_) => PROJECT_PLAN,
        }
    }

    fn key(self) -> i64 {
        match self {
            Self::Span(id)
            | Self::DocumentContent(id)
            | Self::Document(id)
            | Self::ProjectDocuments(id)
            | Self::Project(id) => id,
        }
    }
}

/// Runs the plan for `scope` on `conn` and reports removed row counts.
pub fn execute(conn: &Connection, scope: DeletionScope) -> RepoResult<DeletionReport> {
    let key = scope.key();
    let mut report = DeletionReport::default();
    for step in scope.plan() {
        let rows = conn.execute(step.sql, [key])?;
        report.record(step.table, rows);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{DeletionScope, Table};

    fn rank(table: Table) -> u8 {
        match table {
            Table::Relations => 0,
            Table::Annotations => 1,
            Table::Documents => 2,
            Table::Projects => 3,
        }
    }

    #[test]
    fn every_plan_deletes_children_before_parents() {
        let scopes = [
            DeletionScope::Span(1),
            DeletionScope::DocumentContent(1),
            DeletionScope::Document(1),
            DeletionScope::ProjectDocuments(1),
            DeletionScope::Project(1),
        ];
        for scope in scopes {
            let ranks: Vec<u8> = scope.plan().iter().map(|step| rank(step.table)).collect();
            assert!(
                ranks.windows(2).all(|pair| pair[0] < pair[1]),
                "plan for {scope:?} is not ordered: {ranks:?}"
            );
        }
    }
}
