//! Integration tests for PgTableStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use eventsink_common::Cell;
use eventsink_store::{PgTableStore, StoreError, TableStore};
use serde_json::json;
use sqlx::PgPool;

/// Get a migrated test store, or skip if no test DB is available.
async fn test_store() -> Option<PgTableStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgTableStore::new(pool);
    store.migrate().await.ok()?;
    Some(store)
}

/// Tests share one database; every test works on its own table name.
fn unique_table(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// =========================================================================
// Table lifecycle
// =========================================================================

#[tokio::test]
async fn absent_table_returns_none() {
    let Some(store) = test_store().await else {
        return;
    };

    let found = store.get_table(&unique_table("absent")).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn create_table_persists_header() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("likes");

    let table = store
        .create_table(&name, &cols(&["timestamp", "video_id"]))
        .await
        .unwrap();

    assert_eq!(store.get_table(&name).await.unwrap(), Some(table.clone()));
    assert_eq!(
        store.header(&table).await.unwrap(),
        cols(&["timestamp", "video_id"])
    );
    assert_eq!(store.row_count(&table).await.unwrap(), 0);
}

#[tokio::test]
async fn create_existing_table_fails() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("dup");

    store.create_table(&name, &[]).await.unwrap();
    let err = store.create_table(&name, &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::TableExists(_)));
}

// =========================================================================
// Header writes
// =========================================================================

#[tokio::test]
async fn header_cell_appends_at_end() {
    let Some(store) = test_store().await else {
        return;
    };
    let table = store
        .create_table(&unique_table("videos"), &cols(&["video_id"]))
        .await
        .unwrap();

    store.set_header_cell(&table, 1, "tag").await.unwrap();
    store.set_header_cell(&table, 2, "lang").await.unwrap();

    assert_eq!(
        store.header(&table).await.unwrap(),
        cols(&["video_id", "tag", "lang"])
    );
}

#[tokio::test]
async fn header_cell_past_end_is_rejected() {
    let Some(store) = test_store().await else {
        return;
    };
    let table = store
        .create_table(&unique_table("gap"), &cols(&["a"]))
        .await
        .unwrap();

    let err = store.set_header_cell(&table, 5, "z").await.unwrap_err();
    assert!(matches!(err, StoreError::HeaderIndex { index: 5, len: 1, .. }));
    assert_eq!(store.header(&table).await.unwrap(), cols(&["a"]));
}

// =========================================================================
// Rows
// =========================================================================

#[tokio::test]
async fn rows_roundtrip_in_append_order() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("rows");
    let table = store.create_table(&name, &cols(&["n", "flag", "note"])).await.unwrap();

    for n in 0..3i64 {
        let row = vec![
            Cell::Number(n.into()),
            Cell::Bool(n % 2 == 0),
            Cell::Empty,
        ];
        store.append_row(&table, &row).await.unwrap();
    }

    let rows = store.read_rows(&name).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec![Cell::Number(0i64.into()), Cell::Bool(true), Cell::Empty]);
    assert_eq!(rows[2][0], Cell::Number(2i64.into()));
}

#[tokio::test]
async fn empty_cell_is_stored_as_empty_string() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("blank");
    let table = store.create_table(&name, &cols(&["a"])).await.unwrap();
    store.append_row(&table, &vec![Cell::Empty]).await.unwrap();

    let raw = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT cells FROM sink_rows WHERE table_name = $1",
    )
    .bind(&name)
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(raw, json!([""]));
}

#[tokio::test]
async fn append_with_wrong_arity_is_rejected() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("arity");
    let table = store.create_table(&name, &cols(&["a", "b"])).await.unwrap();

    let err = store.append_row(&table, &vec![Cell::Empty]).await.unwrap_err();
    assert!(matches!(err, StoreError::RowArity { expected: 2, got: 1, .. }));
    assert_eq!(store.row_count(&table).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_oldest_rows_keeps_newest() {
    let Some(store) = test_store().await else {
        return;
    };
    let name = unique_table("trim");
    let table = store.create_table(&name, &cols(&["n"])).await.unwrap();
    for n in 0..10i64 {
        store
            .append_row(&table, &vec![Cell::Number(n.into())])
            .await
            .unwrap();
    }

    store.delete_oldest_rows(&table, 7).await.unwrap();

    let rows = store.read_rows(&name).await.unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Cell::Number(7i64.into())],
            vec![Cell::Number(8i64.into())],
            vec![Cell::Number(9i64.into())],
        ]
    );
    assert_eq!(store.header(&table).await.unwrap(), cols(&["n"]));
}

#[tokio::test]
async fn delete_only_touches_its_own_table() {
    let Some(store) = test_store().await else {
        return;
    };
    let a = store.create_table(&unique_table("a"), &cols(&["n"])).await.unwrap();
    let b = store.create_table(&unique_table("b"), &cols(&["n"])).await.unwrap();
    for n in 0..3i64 {
        store.append_row(&a, &vec![Cell::Number(n.into())]).await.unwrap();
        store.append_row(&b, &vec![Cell::Number(n.into())]).await.unwrap();
    }

    store.delete_oldest_rows(&a, 3).await.unwrap();

    assert_eq!(store.row_count(&a).await.unwrap(), 0);
    assert_eq!(store.row_count(&b).await.unwrap(), 3);
}

#[tokio::test]
async fn row_count_on_unknown_table_fails() {
    let Some(store) = test_store().await else {
        return;
    };

    let ghost = eventsink_store::TableRef::new(unique_table("ghost"));
    let err = store.row_count(&ghost).await.unwrap_err();
    assert!(matches!(err, StoreError::TableNotFound(_)));
}
