//! End-to-end builder behaviour through a recording executor.

mod common;

use common::{AuditEntry, RecordingExecutor, User, user_row};
use polyorm::prelude::*;
use polyorm::{
    Dialect, DocumentCommand, DocumentStore, ExecMode, MySql, Postgres, SqlServer, Sqlite,
    StatementKind, cursor,
};
use serde_json::json;

async fn assert_guards<D: Dialect + 'static>(dialect: D) {
    let db = Db::new(RecordingExecutor::new(dialect));
    let kind = db.executor().dialect().kind();

    let err = db.as_queryable::<User>().to_list().await.unwrap_err();
    assert!(err.is_unconditional(), "{kind:?}: {err}");
    let err = db.as_queryable::<User>().to_result().await.unwrap_err();
    assert!(err.is_unconditional(), "{kind:?}: {err}");
    let err = db
        .as_updatable::<User>()
        .set("age", 1)
        .update()
        .await
        .unwrap_err();
    assert!(err.is_unconditional(), "{kind:?}: {err}");
    let err = db.as_deletable::<User>().delete().await.unwrap_err();
    assert!(err.is_unconditional(), "{kind:?}: {err}");

    assert!(db.executor().calls().is_empty(), "{kind:?} reached the executor");
}

#[tokio::test]
async fn unfiltered_writes_and_lists_are_rejected_everywhere() {
    assert_guards(Postgres).await;
    assert_guards(MySql).await;
    assert_guards(Sqlite).await;
    assert_guards(SqlServer).await;
    assert_guards(DocumentStore).await;
}

#[tokio::test]
async fn unfiltered_first_and_count_are_allowed() {
    let db = Db::new(
        RecordingExecutor::new(Postgres).with_rows(vec![user_row("a", Some("ann"), 30)]),
    );
    let first = db.as_queryable::<User>().first().await.unwrap();
    assert_eq!(
        first,
        Some(User {
            id: "a".into(),
            name: Some("ann".into()),
            age: 30,
        })
    );
    assert_eq!(
        db.executor().calls()[0].sql(),
        "SELECT \"id\", \"name\", \"age\" FROM \"users\" LIMIT 1"
    );
}

#[tokio::test]
async fn pages_chain_through_cursors() {
    let rows = vec![
        user_row("a", None, 1),
        user_row("b", None, 2),
        user_row("c", None, 3),
    ];
    let db = Db::new(RecordingExecutor::new(Sqlite).with_rows(rows));

    let first = db
        .as_queryable::<User>()
        .filter(gte("age", 0))
        .order_by("age")
        .take(3)
        .to_result()
        .await
        .unwrap();
    assert_eq!(first.items.len(), 3);
    assert_eq!(cursor::decode(&first.next_cursor).unwrap(), 3);

    let second = db
        .as_queryable::<User>()
        .filter(gte("age", 0))
        .order_by("age")
        .skip_cursor(&first.next_cursor)
        .take(3)
        .to_result()
        .await
        .unwrap();
    assert_eq!(cursor::decode(&second.next_cursor).unwrap(), 6);

    let calls = db.executor().calls();
    assert!(calls[0].sql().ends_with("ORDER BY \"age\" ASC LIMIT 3"));
    assert!(calls[1].sql().ends_with("ORDER BY \"age\" ASC LIMIT 3 OFFSET 3"));
}

#[tokio::test]
async fn malformed_cursor_is_rejected_before_execution() {
    let db = Db::new(RecordingExecutor::new(Postgres));
    let err = db
        .as_queryable::<User>()
        .filter(eq("id", "a"))
        .skip_cursor("AA")
        .to_list()
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidCursor(_)));
    assert!(db.executor().calls().is_empty());
}

#[tokio::test]
async fn save_is_one_transactional_batch() {
    let db = Db::new(RecordingExecutor::new(Postgres));
    let user = User {
        id: "a".into(),
        name: Some("ann".into()),
        age: 30,
    };
    db.save(&user).await.unwrap();

    let calls = db.executor().calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert!(call.ctx.transactional);
    assert_eq!(call.ctx.mode, ExecMode::Write);
    assert_eq!(call.statements.len(), 2);
    assert_eq!(call.statements[0].text(), "DELETE FROM \"users\" WHERE \"id\" = $1");
    assert_eq!(
        call.statements[1].text(),
        "INSERT INTO \"users\" (\"id\", \"name\", \"age\") VALUES ($1, $2, $3)"
    );
}

#[tokio::test]
async fn routing_key_reaches_every_write() {
    let db = Db::new(RecordingExecutor::new(MySql));
    db.as_updatable_routed::<User>("tenant-9")
        .set("name", "bob")
        .filter(eq("id", "a"))
        .update()
        .await
        .unwrap();
    db.as_deletable_routed::<User>("tenant-9")
        .filter(eq("id", "a"))
        .delete()
        .await
        .unwrap();

    for call in db.executor().calls() {
        assert_eq!(call.ctx.routing_key.as_deref(), Some("tenant-9"));
    }
}

#[test]
fn derive_maps_renamed_and_skipped_fields() {
    let descriptor = AuditEntry::describe();
    assert_eq!(descriptor.name, "AuditEntry");
    assert_eq!(descriptor.table, "audit_entry");
    let columns: Vec<&str> = descriptor.fields.iter().map(|f| f.column).collect();
    assert_eq!(columns, vec!["id", "actor_name"]);
    assert!(descriptor.fields[0].primary_key);

    let entry = AuditEntry::from_record(
        polyorm::Record::new()
            .with("id", 7i64)
            .with("actor_name", "ops"),
    )
    .unwrap();
    assert_eq!(entry.actor, "ops");
    assert_eq!(entry.rendered, "");

    let record = entry.to_record();
    assert_eq!(record.len(), 2);
    assert_eq!(record.get("actor_name"), Some(&Value::from("ops")));
}

#[test]
fn derive_reads_nullability_from_option() {
    let descriptor = User::describe();
    let nullable: Vec<bool> = descriptor.fields.iter().map(|f| f.nullable).collect();
    assert_eq!(nullable, vec![false, true, false]);
}

#[tokio::test]
async fn sorting_by_renamed_field_uses_column() {
    let db = Db::new(RecordingExecutor::new(SqlServer));
    let stmt = db
        .as_queryable::<AuditEntry>()
        .order_by_descending("actor")
        .take(5)
        .to_statement()
        .unwrap();
    assert_eq!(
        stmt.text(),
        "SELECT [id], [actor_name] FROM [audit_entry] ORDER BY [actor_name] DESC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[tokio::test]
async fn document_store_emits_native_commands() {
    let db = Db::new(RecordingExecutor::new(DocumentStore));
    db.as_updatable::<User>()
        .set("age", 31)
        .filter(in_list("id", ["a", "b"]))
        .update()
        .await
        .unwrap();
    db.as_deletable::<User>()
        .filter(not_contains("name", "tmp"))
        .delete()
        .await
        .unwrap();

    let calls = db.executor().calls();
    match calls[0].statements[0].as_document() {
        Some(DocumentCommand::Update {
            collection,
            filter,
            set,
        }) => {
            assert_eq!(collection, "users");
            assert_eq!(filter, &json!({"id": {"$in": ["a", "b"]}}));
            assert_eq!(set.get("age"), Some(&json!(31)));
        }
        other => panic!("expected update command, got {other:?}"),
    }
    assert_eq!(calls[0].ctx.kind, StatementKind::Update);

    match calls[1].statements[0].as_document() {
        Some(DocumentCommand::Delete { filter, .. }) => assert_eq!(
            filter,
            &json!({"$or": [{"name": null}, {"name": {"$not": {"$regex": "tmp"}}}]})
        ),
        other => panic!("expected delete command, got {other:?}"),
    }
}
