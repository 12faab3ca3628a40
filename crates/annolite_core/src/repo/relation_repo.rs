//! Relation repository contract and SQLite implementation.

use crate::model::document::DocumentId;
use crate::model::relation::{Relation, RelationId};
use crate::model::span::SpanId;
use crate::model::EntityRef;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const RELATION_SELECT_SQL: &str = "SELECT
    id,
    doc_id,
    from_ann_id,
    to_ann_id,
    relation_type,
    created_at
FROM relations";

/// Repository interface for relation rows.
pub trait RelationRepository {
    fn insert_relation(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> RepoResult<Relation>;
    fn get_relation(&self, id: RelationId) -> RepoResult<Option<Relation>>;
    /// Ordered by `id ASC`.
    fn list_relations(&self, doc_id: DocumentId) -> RepoResult<Vec<Relation>>;
    fn relation_exists(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> RepoResult<bool>;
    fn update_relation_type(&self, id: RelationId, relation_type: &str) -> RepoResult<()>;
    fn delete_relation(&self, id: RelationId) -> RepoResult<bool>;
}

/// SQLite-backed relation repository.
pub struct SqliteRelationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RelationRepository for SqliteRelationRepository<'_> {
    fn insert_relation(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> RepoResult<Relation> {
        self.conn.execute(
            "INSERT INTO relations (doc_id, from_ann_id, to_ann_id, relation_type)
             VALUES (?1, ?2, ?3, ?4);",
            params![doc_id, from_id, to_id, relation_type],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_relation(id)?
            .ok_or(RepoError::NotFound(EntityRef::Relation(id)))
    }

    fn get_relation(&self, id: RelationId) -> RepoResult<Option<Relation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relation_row(row)?));
        }
        Ok(None)
    }

    fn list_relations(&self, doc_id: DocumentId) -> RepoResult<Vec<Relation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATION_SELECT_SQL} WHERE doc_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([doc_id])?;
        let mut relations = Vec::new();
        while let Some(row) = rows.next()? {
            relations.push(parse_relation_row(row)?);
        }
        Ok(relations)
    }

    fn relation_exists(
        &self,
        doc_id: DocumentId,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM relations
                WHERE doc_id = ?1
                  AND from_ann_id = ?2
                  AND to_ann_id = ?3
                  AND relation_type = ?4
            );",
            params![doc_id, from_id, to_id, relation_type],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn update_relation_type(&self, id: RelationId, relation_type: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE relations SET relation_type = ?2 WHERE id = ?1;",
            params![id, relation_type],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Relation(id)));
        }
        Ok(())
    }

    fn delete_relation(&self, id: RelationId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM relations WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_relation_row(row: &Row<'_>) -> RepoResult<Relation> {
    Ok(Relation {
        id: row.get("id")?,
        doc_id: row.get("doc_id")?,
        from_id: row.get("from_ann_id")?,
        to_id: row.get("to_ann_id")?,
        relation_type: row.get("relation_type")?,
        created_at: row.get("created_at")?,
    })
}
