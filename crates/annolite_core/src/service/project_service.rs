//! Project use-case service.
//!
//! # Responsibility
//! - Create, read, update and delete projects and their vocabularies.
//! - Own the project's on-disk folder lifecycle.
//!
//! # Invariants
//! - Project names are unique; duplicates fail with `NameConflict`.
//! - Vocabulary updates never re-validate existing spans or relations.
//! - Delete removes rows children-first in one transaction; folder removal
//!   afterwards is best-effort and only logged on failure.

use crate::config::CoreConfig;
use crate::model::project::{sanitize_folder_name, NewProject, Project, ProjectId};
use crate::model::validation::{normalize_project_name, ValidationError};
use crate::model::EntityRef;
use crate::repo::cascade::{self, DeletionScope};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::io::ErrorKind;
use std::path::Path;

/// Project service bound to one open connection.
pub struct ProjectService<'a> {
    conn: &'a Connection,
    config: &'a CoreConfig,
}

impl<'a> ProjectService<'a> {
    pub fn new(conn: &'a Connection, config: &'a CoreConfig) -> Self {
        Self { conn, config }
    }

    /// Creates a project, failing with `NameConflict` if the name is taken.
    pub fn create_project(&self, project: NewProject) -> ServiceResult<Project> {
        let name = normalize_project_name(&project.name)?;
        let project = NewProject { name, ..project };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let repo = SqliteProjectRepository::new(&tx);
        if repo.find_project_by_name(&project.name)?.is_some() {
            return Err(ValidationError::NameConflict(project.name).into());
        }
        let created = repo.insert_project(&project)?;
        tx.commit()?;

        info!(
            "event=project_create module=service status=ok project_id={} labels={} relation_types={}",
            created.id,
            created.labels.len(),
            created.relation_types.len()
        );
        self.ensure_project_dir(&created);
        Ok(created)
    }

    /// Returns the project named `project.name`, creating it when missing.
    ///
    /// An existing project is returned as stored; the supplied vocabularies
    /// only apply to a newly created one.
    pub fn ensure_project(&self, project: NewProject) -> ServiceResult<Project> {
        let name = normalize_project_name(&project.name)?;
        if let Some(existing) = SqliteProjectRepository::new(self.conn).find_project_by_name(&name)? {
            return Ok(existing);
        }
        self.create_project(NewProject { name, ..project })
    }

    pub fn get_project(&self, id: ProjectId) -> ServiceResult<Project> {
        SqliteProjectRepository::new(self.conn)
            .get_project(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Project(id)))
    }

    /// Lists all projects, newest first.
    pub fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(SqliteProjectRepository::new(self.conn).list_projects()?)
    }

    pub fn get_project_id_by_name(&self, name: &str) -> ServiceResult<Option<ProjectId>> {
        let project = SqliteProjectRepository::new(self.conn).find_project_by_name(name.trim())?;
        Ok(project.map(|project| project.id))
    }

    /// Replaces the label set. Existing spans are left untouched even when
    /// their label is no longer in the set.
    pub fn update_labels(&self, id: ProjectId, labels: Vec<String>) -> ServiceResult<Project> {
        SqliteProjectRepository::new(self.conn).update_labels(id, &labels)?;
        info!(
            "event=project_update module=service status=ok project_id={id} field=labels count={}",
            labels.len()
        );
        self.get_project(id)
    }

    /// Replaces the relation-type set without re-validating relations.
    pub fn update_relation_types(
        &self,
        id: ProjectId,
        relation_types: Vec<String>,
    ) -> ServiceResult<Project> {
        SqliteProjectRepository::new(self.conn).update_relation_types(id, &relation_types)?;
        info!(
            "event=project_update module=service status=ok project_id={id} field=relation_types count={}",
            relation_types.len()
        );
        self.get_project(id)
    }

    /// Toggles the overlap policy. Existing overlapping spans stay.
    pub fn update_allow_overlap(&self, id: ProjectId, allow_overlap: bool) -> ServiceResult<Project> {
        SqliteProjectRepository::new(self.conn).update_allow_overlap(id, allow_overlap)?;
        info!(
            "event=project_update module=service status=ok project_id={id} field=allow_overlap value={allow_overlap}"
        );
        self.get_project(id)
    }

    /// Deletes a project with all documents, spans and relations.
    ///
    /// Returns `false` when no such project exists. The project's folder and
    /// record file are removed afterwards on a best-effort basis.
    pub fn delete_project(&self, id: ProjectId) -> ServiceResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(project) = SqliteProjectRepository::new(&tx).get_project(id)? else {
            return Ok(false);
        };
        let report = cascade::execute(&tx, DeletionScope::Project(id))?;
        tx.commit()?;

        info!(
            "event=project_delete module=service status=ok project_id={id} documents={} annotations={} relations={}",
            report.documents, report.annotations, report.relations
        );
        self.remove_project_files(&project);
        Ok(report.projects > 0)
    }

    /// Removes every document of a project and empties both vocabularies.
    ///
    /// Returns `false` when no such project exists.
    pub fn clear_project(&self, id: ProjectId) -> ServiceResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let repo = SqliteProjectRepository::new(&tx);
        if repo.get_project(id)?.is_none() {
            return Ok(false);
        }
        let report = cascade::execute(&tx, DeletionScope::ProjectDocuments(id))?;
        repo.update_labels(id, &[])?;
        repo.update_relation_types(id, &[])?;
        tx.commit()?;

        info!(
            "event=project_clear module=service status=ok project_id={id} documents={} annotations={} relations={}",
            report.documents, report.annotations, report.relations
        );
        Ok(true)
    }

    fn ensure_project_dir(&self, project: &Project) {
        let folder = project.folder_name();
        if folder.is_empty() {
            return;
        }
        let dir = self.config.project_dir(&folder);
        if let Err(err) = std::fs::create_dir_all(&dir) {
            warn!(
                "event=project_dir_create module=service status=error project_id={} error={}",
                project.id, err
            );
        }
    }

    fn remove_project_files(&self, project: &Project) {
        let folder = sanitize_folder_name(&project.name);
        if !folder.is_empty() {
            remove_best_effort(project.id, &self.config.project_dir(&folder), true);
        }
        remove_best_effort(project.id, &self.config.record_path(project.id), false);
    }
}

fn remove_best_effort(project_id: ProjectId, path: &Path, is_dir: bool) {
    let result = if is_dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => info!(
            "event=project_files_remove module=service status=ok project_id={project_id} kind={}",
            if is_dir { "dir" } else { "file" }
        ),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=project_files_remove module=service status=error project_id={project_id} kind={} error={err}",
            if is_dir { "dir" } else { "file" }
        ),
    }
}
