use annolite_core::db::open_db_in_memory;
use annolite_core::service::document_service::DocumentService;
use annolite_core::service::project_service::ProjectService;
use annolite_core::service::span_service::SpanService;
use annolite_core::service::sync_service::SyncService;
use annolite_core::{
    CoreConfig, DocumentGraph, EntityRef, NewProject, Project, ProjectGraph, ProjectMeta,
    RelationEntry, ServiceError, SpanEntry, ValidationError,
};
use rusqlite::Connection;
use serde_json::json;

fn project(conn: &Connection, name: &str) -> Project {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    ProjectService::new(conn, &config)
        .create_project(
            NewProject::new(name, vec!["PER".to_string(), "LOC".to_string()])
                .with_relation_types(vec!["lives_in".to_string()]),
        )
        .unwrap()
}

fn span(id: i64, start: i64, end: i64, label: &str) -> SpanEntry {
    SpanEntry {
        id,
        start,
        end,
        label: label.to_string(),
    }
}

fn relation(from_id: i64, to_id: i64) -> RelationEntry {
    RelationEntry {
        from_id,
        to_id,
        relation_type: "lives_in".to_string(),
    }
}

fn new_document(spans: Vec<SpanEntry>, relations: Vec<RelationEntry>) -> DocumentGraph {
    DocumentGraph {
        id: None,
        text: "Mike lives in America.".to_string(),
        status: None,
        spans,
        relations,
    }
}

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn save_translates_payload_span_ids() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);

    let graph = ProjectGraph {
        project: None,
        documents: Some(vec![new_document(
            vec![span(-1, 0, 4, "PER"), span(-2, 15, 22, "LOC")],
            vec![relation(-1, -2), relation(-1, -77)],
        )]),
    };
    let summary = sync.save_project_data(demo.id, &graph).unwrap();
    assert_eq!(summary.status, "ok");
    assert_eq!(summary.documents.len(), 1);
    assert_eq!(summary.documents[0].status, "saved");

    let loaded = sync.load_project_data(demo.id).unwrap();
    let documents = loaded.documents.unwrap();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.id, Some(summary.documents[0].id));
    assert_eq!(document.status.as_deref(), Some("pending"));
    assert_eq!(document.spans.len(), 2);
    assert_eq!(document.relations.len(), 1);
    assert_eq!(document.relations[0].from_id, document.spans[0].id);
    assert_eq!(document.relations[0].to_id, document.spans[1].id);
}

#[test]
fn saving_a_loaded_graph_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);
    sync.save_project_data(
        demo.id,
        &ProjectGraph {
            project: None,
            documents: Some(vec![new_document(
                vec![span(1, 0, 4, "PER"), span(2, 15, 22, "LOC")],
                vec![relation(1, 2)],
            )]),
        },
    )
    .unwrap();

    let first = sync.load_project_data(demo.id).unwrap();
    sync.save_project_data(demo.id, &first).unwrap();
    let second = sync.load_project_data(demo.id).unwrap();

    assert_eq!(first.project, second.project);
    let strip = |graph: &ProjectGraph| {
        graph
            .documents
            .iter()
            .flatten()
            .map(|doc| {
                let spans: Vec<_> = doc
                    .spans
                    .iter()
                    .map(|s| (s.start, s.end, s.label.clone()))
                    .collect();
                (doc.id, doc.text.clone(), doc.status.clone(), spans, doc.relations.len())
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
    assert_eq!(table_count(&conn, "documents"), 1);
}

#[test]
fn metadata_patch_updates_project() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);

    let graph = ProjectGraph {
        project: Some(ProjectMeta {
            name: Some("Renamed".to_string()),
            labels: Some(vec!["ORG".to_string()]),
            ..ProjectMeta::default()
        }),
        documents: Some(vec![new_document(vec![span(1, 0, 4, "ORG")], Vec::new())]),
    };
    sync.save_project_data(demo.id, &graph).unwrap();

    let meta = sync.load_project_data(demo.id).unwrap().project.unwrap();
    assert_eq!(meta.name.as_deref(), Some("Renamed"));
    assert_eq!(meta.labels, Some(vec!["ORG".to_string()]));
    assert_eq!(meta.relation_types, Some(vec!["lives_in".to_string()]));
    assert_eq!(meta.allow_overlap, Some(false));
}

#[test]
fn invalid_payload_rolls_everything_back() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);

    let graph = ProjectGraph {
        project: Some(ProjectMeta {
            allow_overlap: Some(true),
            ..ProjectMeta::default()
        }),
        documents: Some(vec![
            new_document(vec![span(1, 0, 4, "PER")], Vec::new()),
            new_document(vec![span(1, 0, 99, "PER")], Vec::new()),
        ]),
    };
    let err = sync.save_project_data(demo.id, &graph).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidRange { start: 0, end: 99, .. })
    ));

    assert_eq!(table_count(&conn, "documents"), 0);
    assert_eq!(table_count(&conn, "annotations"), 0);
    let meta = sync.load_project_data(demo.id).unwrap().project.unwrap();
    assert_eq!(meta.allow_overlap, Some(false));
}

#[test]
fn loaded_graph_with_orphaned_label_saves_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let projects = ProjectService::new(&conn, &config);
    let demo = projects
        .create_project(NewProject::new(
            "Demo",
            vec!["PER".to_string(), "LOC".to_string()],
        ))
        .unwrap();
    let doc = DocumentService::new(&conn)
        .import_texts(demo.id, ["Mike lives in America."])
        .unwrap()
        .remove(0);
    SpanService::new(&conn).add_span(doc.id, 15, 22, "LOC").unwrap();
    projects
        .update_labels(demo.id, vec!["PER".to_string()])
        .unwrap();

    let sync = SyncService::new(&conn);
    let loaded = sync.load_project_data(demo.id).unwrap();
    sync.save_project_data(demo.id, &loaded).unwrap();

    let spans = SpanService::new(&conn).list_spans(doc.id).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].start, spans[0].end), (15, 22));
    assert_eq!(spans[0].label, "LOC");
    let meta = sync.load_project_data(demo.id).unwrap().project.unwrap();
    assert_eq!(meta.labels, Some(vec!["PER".to_string()]));
}

#[test]
fn loaded_overlapping_spans_save_after_overlap_is_disabled() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let projects = ProjectService::new(&conn, &config);
    let demo = projects
        .create_project(
            NewProject::new("Demo", vec!["PER".to_string()]).with_allow_overlap(true),
        )
        .unwrap();
    let doc = DocumentService::new(&conn)
        .import_texts(demo.id, ["Mike lives in America."])
        .unwrap()
        .remove(0);
    let spans = SpanService::new(&conn);
    spans.add_span(doc.id, 0, 4, "PER").unwrap();
    spans.add_span(doc.id, 2, 6, "PER").unwrap();
    projects.update_allow_overlap(demo.id, false).unwrap();

    let sync = SyncService::new(&conn);
    let loaded = sync.load_project_data(demo.id).unwrap();
    sync.save_project_data(demo.id, &loaded).unwrap();

    let ranges: Vec<_> = spans
        .list_spans(doc.id)
        .unwrap()
        .into_iter()
        .map(|span| (span.start, span.end))
        .collect();
    assert_eq!(ranges, vec![(0, 4), (2, 6)]);
}

#[test]
fn payload_labels_and_types_outside_vocabulary_are_kept() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);

    let graph = ProjectGraph {
        project: None,
        documents: Some(vec![new_document(
            vec![span(1, 0, 4, "NOPE"), span(2, 2, 6, "PER")],
            vec![RelationEntry {
                from_id: 1,
                to_id: 2,
                relation_type: "knows".to_string(),
            }],
        )]),
    };
    sync.save_project_data(demo.id, &graph).unwrap();

    let doc = &sync.load_project_data(demo.id).unwrap().documents.unwrap()[0];
    assert_eq!(doc.spans[0].label, "NOPE");
    assert_eq!(doc.relations.len(), 1);
    assert_eq!(doc.relations[0].relation_type, "knows");
}

#[test]
fn rename_onto_existing_project_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    project(&conn, "Taken");

    let graph = ProjectGraph {
        project: Some(ProjectMeta {
            name: Some("Taken".to_string()),
            ..ProjectMeta::default()
        }),
        documents: None,
    };
    let err = SyncService::new(&conn)
        .save_project_data(demo.id, &graph)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::NameConflict(_))));
}

#[test]
fn existing_document_is_overwritten_in_place() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let other = project(&conn, "Other");
    let sync = SyncService::new(&conn);
    let saved = sync
        .save_project_data(
            demo.id,
            &ProjectGraph {
                project: None,
                documents: Some(vec![new_document(vec![span(1, 0, 4, "PER")], Vec::new())]),
            },
        )
        .unwrap();
    let doc_id = saved.documents[0].id;

    let update = DocumentGraph {
        id: Some(doc_id),
        text: "Anna".to_string(),
        status: Some("done".to_string()),
        spans: Vec::new(),
        relations: Vec::new(),
    };
    sync.save_project_data(
        demo.id,
        &ProjectGraph {
            project: None,
            documents: Some(vec![update.clone()]),
        },
    )
    .unwrap();

    let doc = &sync.load_project_data(demo.id).unwrap().documents.unwrap()[0];
    assert_eq!(doc.id, Some(doc_id));
    assert_eq!(doc.text, "Anna");
    assert_eq!(doc.status.as_deref(), Some("done"));
    assert!(doc.spans.is_empty());

    // The same id under another project is treated as a new document.
    let summary = sync
        .save_project_data(
            other.id,
            &ProjectGraph {
                project: None,
                documents: Some(vec![update]),
            },
        )
        .unwrap();
    assert_ne!(summary.documents[0].id, doc_id);
}

#[test]
fn missing_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let sync = SyncService::new(&conn);

    let err = sync.load_project_data(77).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Project(77))));
    let err = sync
        .save_project_data(77, &ProjectGraph::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Project(77))));
}

#[test]
fn load_uses_wire_field_names() {
    let conn = open_db_in_memory().unwrap();
    let demo = project(&conn, "Demo");
    let sync = SyncService::new(&conn);
    let payload = json!({
        "documents": [{
            "text": "Mike lives in America.",
            "spans": [
                {"id": 10, "start": 0, "end": 4, "label": "PER"},
                {"id": 11, "start": 15, "end": 22, "label": "LOC"}
            ],
            "relations": [{"fromId": 10, "toId": 11, "type": "lives_in"}]
        }]
    });
    let graph: ProjectGraph = serde_json::from_value(payload).unwrap();
    sync.save_project_data(demo.id, &graph).unwrap();

    let loaded = serde_json::to_value(sync.load_project_data(demo.id).unwrap()).unwrap();
    let relation = &loaded["documents"][0]["relations"][0];
    assert_eq!(relation["type"], "lives_in");
    assert!(relation["fromId"].is_i64());
    assert_eq!(loaded["project"]["name"], "Demo");
    assert_eq!(loaded["project"]["allow_overlap"], false);

    let spans = SpanService::new(&conn);
    let doc_id = loaded["documents"][0]["id"].as_i64().unwrap();
    assert_eq!(spans.list_spans(doc_id).unwrap().len(), 2);
}
