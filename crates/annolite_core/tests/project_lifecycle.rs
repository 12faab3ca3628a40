use annolite_core::db::open_db_in_memory;
use annolite_core::service::document_service::DocumentService;
use annolite_core::service::project_service::ProjectService;
use annolite_core::service::relation_service::RelationService;
use annolite_core::service::span_service::SpanService;
use annolite_core::{CoreConfig, EntityRef, NewProject, ServiceError, ValidationError};
use rusqlite::Connection;

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_defaults_to_empty_vocabularies_and_no_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(&conn, &config);

    let project = service.create_project(NewProject::new("  Bare  ", Vec::new())).unwrap();
    assert_eq!(project.name, "Bare");
    assert!(project.labels.is_empty());
    assert!(project.relation_types.is_empty());
    assert!(!project.allow_overlap);
    assert!(config.project_dir("Bare").is_dir());

    let loaded = service.get_project(project.id).unwrap();
    assert_eq!(loaded, project);
}

#[test]
fn duplicate_and_blank_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(&conn, &config);

    service
        .create_project(NewProject::new("Demo", labels(&["PER"])))
        .unwrap();
    let err = service
        .create_project(NewProject::new("Demo", labels(&["LOC"])))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::NameConflict(ref name)) if name == "Demo"
    ));

    let err = service.create_project(NewProject::new("   ", Vec::new())).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::EmptyName)));
    assert_eq!(service.list_projects().unwrap().len(), 1);
}

#[test]
fn ensure_project_returns_existing_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(&conn, &config);

    let first = service
        .ensure_project(NewProject::new("Demo", labels(&["PER"])))
        .unwrap();
    let second = service
        .ensure_project(NewProject::new("Demo", labels(&["LOC", "ORG"])))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(service.get_project_id_by_name("Demo").unwrap(), Some(first.id));
    assert_eq!(service.get_project_id_by_name("Other").unwrap(), None);
}

#[test]
fn list_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(&conn, &config);

    let a = service.create_project(NewProject::new("a", Vec::new())).unwrap();
    let b = service.create_project(NewProject::new("b", Vec::new())).unwrap();
    let ids: Vec<_> = service.list_projects().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[test]
fn shrinking_labels_keeps_existing_spans() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(&conn, &config);
    let project = projects
        .create_project(NewProject::new("Demo", labels(&["PER", "LOC"])))
        .unwrap();
    let doc = DocumentService::new(&conn)
        .import_texts(project.id, ["Mike lives in America."])
        .unwrap()
        .remove(0);
    let spans = SpanService::new(&conn);
    spans.add_span(doc.id, 15, 22, "LOC").unwrap();

    let updated = projects.update_labels(project.id, labels(&["PER"])).unwrap();
    assert_eq!(updated.labels, labels(&["PER"]));

    let kept = spans.list_spans(doc.id).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].label, "LOC");

    let err = spans.add_span(doc.id, 0, 4, "LOC").unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidLabel(_))));
}

#[test]
fn toggling_overlap_updates_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(&conn, &config);
    let project = projects
        .create_project(NewProject::new("Demo", labels(&["PER"])))
        .unwrap();

    assert!(projects.update_allow_overlap(project.id, true).unwrap().allow_overlap);
    let updated = projects
        .update_relation_types(project.id, labels(&["lives_in"]))
        .unwrap();
    assert!(updated.allow_overlap);
    assert_eq!(updated.relation_types, labels(&["lives_in"]));
}

#[test]
fn delete_cascades_rows_and_removes_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(&conn, &config);
    let project = projects
        .create_project(
            NewProject::new("Demo", labels(&["PER", "LOC"]))
                .with_relation_types(labels(&["lives_in"])),
        )
        .unwrap();
    let doc = DocumentService::new(&conn)
        .import_texts(project.id, ["Mike lives in America."])
        .unwrap()
        .remove(0);
    let spans = SpanService::new(&conn);
    let per = spans.add_span(doc.id, 0, 4, "PER").unwrap();
    let loc = spans.add_span(doc.id, 15, 22, "LOC").unwrap();
    RelationService::new(&conn)
        .add_relation(doc.id, per.id, loc.id, "lives_in")
        .unwrap();
    std::fs::create_dir_all(&config.data_dir).unwrap();
    std::fs::write(config.record_path(project.id), "{}\n").unwrap();

    assert!(projects.delete_project(project.id).unwrap());

    for table in ["projects", "documents", "annotations", "relations"] {
        assert_eq!(count(&conn, table), 0, "table {table} should be empty");
    }
    assert!(!config.project_dir("Demo").exists());
    assert!(!config.record_path(project.id).exists());
    let err = projects.get_project(project.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Project(id)) if id == project.id));

    assert!(!projects.delete_project(project.id).unwrap());
}

#[test]
fn clear_removes_documents_and_vocabularies() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(&conn, &config);
    let project = projects
        .create_project(NewProject::new("Demo", labels(&["PER"])))
        .unwrap();
    let doc = DocumentService::new(&conn)
        .import_texts(project.id, ["Mike"])
        .unwrap()
        .remove(0);
    SpanService::new(&conn).add_span(doc.id, 0, 4, "PER").unwrap();

    assert!(projects.clear_project(project.id).unwrap());
    let cleared = projects.get_project(project.id).unwrap();
    assert!(cleared.labels.is_empty());
    assert_eq!(count(&conn, "documents"), 0);
    assert_eq!(count(&conn, "annotations"), 0);

    assert!(!projects.clear_project(9_999).unwrap());
}
