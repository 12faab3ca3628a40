use annolite_core::db::open_db_in_memory;
use annolite_core::service::document_service::DocumentService;
use annolite_core::service::project_service::ProjectService;
use annolite_core::service::relation_service::RelationService;
use annolite_core::service::span_service::SpanService;
use annolite_core::{CoreConfig, EntityRef, NewProject, ServiceError, Span, ValidationError};
use rusqlite::Connection;

struct Fixture {
    doc_id: i64,
    other_doc_id: i64,
    per: Span,
    loc: Span,
    other: Span,
}

fn fixture(conn: &Connection) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::from_root(dir.path());
    let project = ProjectService::new(conn, &config)
        .create_project(
            NewProject::new("Demo", vec!["PER".to_string(), "LOC".to_string()])
                .with_relation_types(vec!["lives_in".to_string(), "knows".to_string()]),
        )
        .unwrap();
    let docs = DocumentService::new(conn)
        .import_texts(project.id, ["Mike lives in America.", "Anna"])
        .unwrap();
    let spans = SpanService::new(conn);
    Fixture {
        doc_id: docs[0].id,
        other_doc_id: docs[1].id,
        per: spans.add_span(docs[0].id, 0, 4, "PER").unwrap(),
        loc: spans.add_span(docs[0].id, 15, 22, "LOC").unwrap(),
        other: spans.add_span(docs[1].id, 0, 4, "PER").unwrap(),
    }
}

#[test]
fn add_relation_is_directed() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let relations = RelationService::new(&conn);

    let forward = relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "lives_in")
        .unwrap();
    let backward = relations
        .add_relation(fx.doc_id, fx.loc.id, fx.per.id, "lives_in")
        .unwrap();
    assert_ne!(forward.id, backward.id);
    assert_eq!(relations.list_relations(fx.doc_id).unwrap(), vec![forward, backward]);
}

#[test]
fn duplicate_relation_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let relations = RelationService::new(&conn);
    relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "lives_in")
        .unwrap();

    let err = relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "lives_in")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::DuplicateRelation { .. })
    ));
    relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "knows")
        .unwrap();
}

#[test]
fn endpoints_must_share_the_document() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);

    let err = RelationService::new(&conn)
        .add_relation(fx.doc_id, fx.per.id, fx.other.id, "knows")
        .unwrap_err();
    match err {
        ServiceError::Validation(ValidationError::EndpointMismatch { doc_id, span_id }) => {
            assert_eq!(doc_id, fx.doc_id);
            assert_eq!(span_id, fx.other.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_ne!(fx.other_doc_id, fx.doc_id);
}

#[test]
fn unknown_type_and_missing_endpoint_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let relations = RelationService::new(&conn);

    let err = relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "born_in")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidType(_))));

    let err = relations
        .add_relation(fx.doc_id, fx.per.id, 9_999, "knows")
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Span(9_999))));

    let err = relations
        .add_relation(9_999, fx.per.id, fx.loc.id, "knows")
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Document(9_999))));
}

#[test]
fn update_type_revalidates_membership() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let relations = RelationService::new(&conn);
    let relation = relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "lives_in")
        .unwrap();

    let updated = relations.update_relation_type(relation.id, "knows").unwrap();
    assert_eq!(updated.relation_type, "knows");
    assert_eq!((updated.from_id, updated.to_id), (fx.per.id, fx.loc.id));

    let err = relations
        .update_relation_type(relation.id, "born_in")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidType(_))));
}

#[test]
fn delete_relation_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let relations = RelationService::new(&conn);
    let relation = relations
        .add_relation(fx.doc_id, fx.per.id, fx.loc.id, "lives_in")
        .unwrap();

    assert!(relations.delete_relation(relation.id).unwrap());
    assert!(!relations.delete_relation(relation.id).unwrap());
}
