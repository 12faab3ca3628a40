//! Relation use-case service.
//!
//! # Invariants
//! - Both endpoints exist and belong to the relation's document.
//! - The type is in the owning project's relation-type set.
//! - `(doc, from, to, type)` is unique; direction matters.
//! - Endpoints are immutable after creation; only the type can change.

use crate::model::document::DocumentId;
use crate::model::relation::{Relation, RelationId};
use crate::model::span::SpanId;
use crate::model::validation::{check_relation_type, ValidationError};
use crate::model::EntityRef;
use crate::repo::relation_repo::{RelationRepository, SqliteRelationRepository};
use crate::repo::span_repo::{SpanRepository, SqliteSpanRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{load_document_scope, logged};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Relation service bound to one open connection.
pub struct RelationService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RelationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists relations of a document in creation order.
    pub fn list_relations(&self, doc_id: DocumentId) -> ServiceResult<Vec<Relation>> {
        Ok(SqliteRelationRepository::new(self.conn).list_relations(doc_id)?)
    }

    pub fn get_relation(&self, id: RelationId) -> ServiceResult<Relation> {
        SqliteRelationRepository::new(self.conn)
            .get_relation(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Relation(id)))
    }

    pub fn add_relation(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> ServiceResult<Relation> {
        logged(
            "relation_add",
            self.add_relation_inner(doc_id, from_id, to_id, relation_type),
        )
    }

    fn add_relation_inner(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> ServiceResult<Relation> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (_, project) = load_document_scope(&tx, doc_id)?;

        let spans = SqliteSpanRepository::new(&tx);
        for span_id in [from_id, to_id] {
            let span = spans
                .get_span(span_id)?
                .ok_or(ServiceError::NotFound(EntityRef::Span(span_id)))?;
            if span.doc_id != doc_id {
                return Err(ValidationError::EndpointMismatch { doc_id, span_id }.into());
            }
        }
        check_relation_type(&project, relation_type)?;

        let repo = SqliteRelationRepository::new(&tx);
        if repo.relation_exists(doc_id, from_id, to_id, relation_type)? {
            return Err(ValidationError::DuplicateRelation {
                from_id,
                to_id,
                relation_type: relation_type.to_string(),
            }
            .into());
        }
        let relation = repo.insert_relation(doc_id, from_id, to_id, relation_type)?;
        tx.commit()?;

        info!(
            "event=relation_add module=service status=ok doc_id={doc_id} relation_id={} from_id={from_id} to_id={to_id}",
            relation.id
        );
        Ok(relation)
    }

    /// Changes a relation's type after membership validation.
    pub fn update_relation_type(
        &self,
        id: RelationId,
        relation_type: &str,
    ) -> ServiceResult<Relation> {
        logged(
            "relation_update",
            self.update_relation_type_inner(id, relation_type),
        )
    }

    fn update_relation_type_inner(
        &self,
        id: RelationId,
        relation_type: &str,
    ) -> ServiceResult<Relation> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let repo = SqliteRelationRepository::new(&tx);
        let current = repo
            .get_relation(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Relation(id)))?;
        let (_, project) = load_document_scope(&tx, current.doc_id)?;
        check_relation_type(&project, relation_type)?;

        if current.relation_type != relation_type
            && repo.relation_exists(current.doc_id, current.from_id, current.to_id, relation_type)?
        {
            return Err(ValidationError::DuplicateRelation {
                from_id: current.from_id,
                to_id: current.to_id,
                relation_type: relation_type.to_string(),
            }
            .into());
        }

        repo.update_relation_type(id, relation_type)?;
        let updated = repo
            .get_relation(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Relation(id)))?;
        tx.commit()?;

        info!("event=relation_update module=service status=ok relation_id={id}");
        Ok(updated)
    }

    /// Deletes a relation. Returns `false` when it did not exist.
    pub fn delete_relation(&self, id: RelationId) -> ServiceResult<bool> {
        let deleted = SqliteRelationRepository::new(self.conn).delete_relation(id)?;
        info!("event=relation_delete module=service status=ok relation_id={id} deleted={deleted}");
        Ok(deleted)
    }
}
