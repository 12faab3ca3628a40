//! Project repository contract and SQLite implementation.
//!
//! # Invariants
//! - `labels` and `relation_types` are stored as JSON string arrays and keep
//!   caller order.
//! - `name` uniqueness is also enforced by the schema; services check it
//!   first so callers get `NameConflict` instead of a constraint error.

use crate::model::project::{NewProject, Project, ProjectId};
use crate::model::EntityRef;
use crate::repo::{bool_to_int, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    labels,
    relation_types,
    allow_overlap,
    created_at
FROM projects";

/// Repository interface for project rows.
pub trait ProjectRepository {
    fn insert_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn find_project_by_name(&self, name: &str) -> RepoResult<Option<Project>>;
    /// Newest first.
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn rename_project(&self, id: ProjectId, name: &str) -> RepoResult<()>;
    fn update_labels(&self, id: ProjectId, labels: &[String]) -> RepoResult<()>;
    fn update_relation_types(&self, id: ProjectId, relation_types: &[String]) -> RepoResult<()>;
    fn update_allow_overlap(&self, id: ProjectId, allow_overlap: bool) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn update_column(&self, id: ProjectId, sql: &str, value: &dyn rusqlite::ToSql) -> RepoResult<()> {
        let changed = self.conn.execute(sql, params![id, value])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Project(id)));
        }
        Ok(())
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn insert_project(&self, project: &NewProject) -> RepoResult<Project> {
        self.conn.execute(
            "INSERT INTO projects (name, labels, relation_types, allow_overlap)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                project.name.as_str(),
                encode_string_list(&project.labels)?,
                encode_string_list(&project.relation_types)?,
                bool_to_int(project.allow_overlap),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .ok_or(RepoError::NotFound(EntityRef::Project(id)))
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn find_project_by_name(&self, name: &str) -> RepoResult<Option<Project>> {
        let id: Option<ProjectId> = self
            .conn
            .query_row("SELECT id FROM projects WHERE name = ?1;", [name], |row| {
                row.get(0)
            })
            .optional()?;
        match id {
            Some(id) => self.get_project(id),
            None => Ok(None),
        }
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} ORDER BY id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn rename_project(&self, id: ProjectId, name: &str) -> RepoResult<()> {
        self.update_column(id, "UPDATE projects SET name = ?2 WHERE id = ?1;", &name)
    }

    fn update_labels(&self, id: ProjectId, labels: &[String]) -> RepoResult<()> {
        let encoded = encode_string_list(labels)?;
        self.update_column(id, "UPDATE projects SET labels = ?2 WHERE id = ?1;", &encoded)
    }

    fn update_relation_types(&self, id: ProjectId, relation_types: &[String]) -> RepoResult<()> {
        let encoded = encode_string_list(relation_types)?;
        self.update_column(
            id,
            "UPDATE projects SET relation_types = ?2 WHERE id = ?1;",
            &encoded,
        )
    }

    fn update_allow_overlap(&self, id: ProjectId, allow_overlap: bool) -> RepoResult<()> {
        self.update_column(
            id,
            "UPDATE projects SET allow_overlap = ?2 WHERE id = ?1;",
            &bool_to_int(allow_overlap),
        )
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: ProjectId = row.get("id")?;
    let labels_text: String = row.get("labels")?;
    let relation_types_text: String = row.get("relation_types")?;
    let allow_overlap = match row.get::<_, i64>("allow_overlap")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid allow_overlap value `{other}` in projects.allow_overlap (id={id})"
            )));
        }
    };

    Ok(Project {
        id,
        name: row.get("name")?,
        labels: decode_string_list(&labels_text, "projects.labels")?,
        relation_types: decode_string_list(&relation_types_text, "projects.relation_types")?,
        allow_overlap,
        created_at: row.get("created_at")?,
    })
}

fn encode_string_list(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode string list: {err}")))
}

fn decode_string_list(value: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid JSON string list in {column}: {err}"))
    })
}
