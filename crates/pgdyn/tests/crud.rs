//! End-to-end CRUD against a live database.
//!
//! Every test skips when `DATABASE_URL` is not set.

#![cfg(feature = "pool")]

use pgdyn::{
    AssocRow, Db, DbConfig, DbError, DbResult, Pool, Select, TableSchema, UpsertIdPolicy, Value,
    assoc_row,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn open(test: &str) -> Option<Db<Pool>> {
    open_with(test, DbConfig::new())
}

fn open_with(test: &str, config: DbConfig) -> Option<Db<Pool>> {
    let _ = dotenvy::dotenv();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; skipping {test}");
        return None;
    };
    Some(Db::open_with_config("postgres", &database_url, config).expect("open pool"))
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("pgdyn_{prefix}_{}_{}", std::process::id(), nanos)
}

fn test_table(name: &str) -> TableSchema {
    TableSchema::new(name)
        .column("id", "integer")
        .column("name", "varchar(50)")
        .column("description", "text")
        .column("score", "integer")
}

async fn count(db: &Db<Pool>, table: &str) -> DbResult<usize> {
    Ok(db.get(table, &["*"], "", &[], None).await?.len())
}

#[tokio::test]
async fn create_insert_select_roundtrip() -> DbResult<()> {
    let Some(db) = open("create_insert_select_roundtrip") else {
        return Ok(());
    };
    let table = unique_table("t");
    db.create_table(
        &TableSchema::new(&table)
            .column("id", "integer")
            .column("label", "varchar(10)"),
    )
    .await?;

    let schema = db.get_schema(&table).await?;
    assert_eq!(schema.columns.len(), 2);
    assert_eq!(schema.column_type("id"), Some("integer"));
    assert_eq!(schema.column_type("label"), Some("varchar(10)"));
    assert!(db.list_tables().await?.contains(&table));
    assert!(db.list_sequences().await?.contains(&format!("sq_{table}")));

    let id = db.insert(&table, &assoc_row! { "label" => "hi" }).await?;
    assert!(id > 0);

    let rows = db.select(&Select::new(&table)).await?;
    let expected: AssocRow = assoc_row! { "id" => id, "label" => "hi" };
    assert_eq!(rows, vec![expected]);

    db.delete_table(&table).await?;
    assert!(db.get_schema(&table).await?.is_empty());
    assert!(!db.list_sequences().await?.contains(&format!("sq_{table}")));
    db.close();
    Ok(())
}

#[tokio::test]
async fn upsert_inserts_then_updates() -> DbResult<()> {
    let Some(db) = open("upsert_inserts_then_updates") else {
        return Ok(());
    };
    let table = unique_table("upsert");
    db.create_table(&test_table(&table)).await?;

    let before = count(&db, &table).await?;
    let id = db
        .upsert(&table, &assoc_row! { "name" => "toto", "description" => "tata" })
        .await?;
    assert_eq!(count(&db, &table).await?, before + 1);

    let zero = db
        .upsert(&table, &assoc_row! { "id" => 0, "name" => "zero" })
        .await?;
    assert_ne!(zero, 0);
    assert_eq!(count(&db, &table).await?, before + 2);

    let same = db
        .upsert(
            &table,
            &assoc_row! { "id" => id, "name" => "titi", "description" => "it's" },
        )
        .await?;
    assert_eq!(same, id);
    assert_eq!(count(&db, &table).await?, before + 2);

    let rows = db
        .get(&table, &["name", "description"], &format!("id = {id}"), &[], None)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], Value::from("titi"));
    assert_eq!(rows[0]["description"], Value::from("it's"));

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn update_of_missing_id_reports_success() -> DbResult<()> {
    let Some(db) = open("update_of_missing_id_reports_success") else {
        return Ok(());
    };
    let table = unique_table("ghost");
    db.create_table(&test_table(&table)).await?;

    let applied = db
        .update(&table, &assoc_row! { "id" => 987_654, "name" => "nobody" })
        .await?;
    assert_eq!(
        applied,
        format!("UPDATE {table} SET name = 'nobody' WHERE id = 987654")
    );
    assert_eq!(count(&db, &table).await?, 0);

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn presence_policy_updates_id_zero() -> DbResult<()> {
    let Some(db) = open_with(
        "presence_policy_updates_id_zero",
        DbConfig::new().upsert_policy(UpsertIdPolicy::Presence),
    ) else {
        return Ok(());
    };
    let table = unique_table("presence");
    db.create_table(&test_table(&table)).await?;

    let id = db.upsert(&table, &assoc_row! { "id" => 0, "name" => "z" }).await?;
    assert_eq!(id, 0);
    assert_eq!(count(&db, &table).await?, 0);

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn delete_removes_exactly_one_row() -> DbResult<()> {
    let Some(db) = open("delete_removes_exactly_one_row") else {
        return Ok(());
    };
    let table = unique_table("delete");
    db.create_table(&test_table(&table)).await?;

    let first = db.insert(&table, &assoc_row! { "name" => "a", "score" => 1 }).await?;
    db.insert(&table, &assoc_row! { "name" => "b", "score" => 2 }).await?;
    assert_eq!(count(&db, &table).await?, 2);

    let applied = db.delete(&table, &assoc_row! { "id" => first }).await?;
    assert_eq!(applied, format!("DELETE FROM {table} WHERE id = {first}"));
    assert_eq!(count(&db, &table).await?, 1);

    let rest = db.select(&Select::new(&table).columns(["name"])).await?;
    assert_eq!(rest[0]["name"], Value::from("b"));

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn add_and_drop_column() -> DbResult<()> {
    let Some(db) = open("add_and_drop_column") else {
        return Ok(());
    };
    let table = unique_table("columns");
    db.create_table(&test_table(&table)).await?;

    let old = db.get_schema(&table).await?;
    db.add_column(&table, "addcolumn", "integer").await?;
    let added = db.get_schema(&table).await?;
    assert_eq!(added.columns.len(), old.columns.len() + 1);
    assert_eq!(added.column_type("addcolumn"), Some("integer"));

    db.delete_column(&table, "addcolumn").await?;
    let dropped = db.get_schema(&table).await?;
    assert_eq!(dropped.columns.len(), old.columns.len());
    assert_eq!(dropped.column_type("addcolumn"), None);

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn sorted_select_and_typed_values() -> DbResult<()> {
    let Some(db) = open("sorted_select_and_typed_values") else {
        return Ok(());
    };
    let table = unique_table("sorted");
    db.create_table(
        &TableSchema::new(&table)
            .column("id", "integer")
            .column("label", "varchar(20)")
            .column("born", "date")
            .column("ratio", "double precision")
            .column("active", "boolean"),
    )
    .await?;

    for (label, born, ratio) in [("b", "2001-02-03", 0.5), ("a", "1999-12-31", 2.0)] {
        db.insert(
            &table,
            &assoc_row! { "label" => label, "born" => born, "ratio" => ratio, "active" => true },
        )
        .await?;
    }

    let rows = db
        .select(
            &Select::new(&table)
                .columns(["label", "born", "ratio", "active"])
                .order_by(["label"])
                .direction(pgdyn::SortDirection::Desc),
        )
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], Value::from("b"));
    assert_eq!(rows[0]["born"].to_string(), "2001-02-03");
    assert_eq!(rows[0]["ratio"], Value::Float(0.5));
    assert_eq!(rows[1]["active"], Value::Bool(true));

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn unknown_table_has_empty_schema() -> DbResult<()> {
    let Some(db) = open("unknown_table_has_empty_schema") else {
        return Ok(());
    };
    let schema = db.get_schema(&unique_table("missing")).await?;
    assert!(schema.is_empty());
    db.close();
    Ok(())
}

#[tokio::test]
async fn missing_table_reports_sqlstate() -> DbResult<()> {
    let Some(db) = open("missing_table_reports_sqlstate") else {
        return Ok(());
    };
    let err = db
        .select(&Select::new(unique_table("nowhere")))
        .await
        .unwrap_err();
    assert_eq!(err.sqlstate(), Some("42P01"));
    db.close();
    Ok(())
}

#[tokio::test]
async fn undecodable_column_aborts_select() -> DbResult<()> {
    let Some(db) = open("undecodable_column_aborts_select") else {
        return Ok(());
    };
    let table = unique_table("point");
    db.create_table(
        &TableSchema::new(&table)
            .column("id", "integer")
            .column("p", "point"),
    )
    .await?;
    db.query(&format!("INSERT INTO {table} (p) VALUES (point(1, 2))"))
        .await?;

    let err = db.select(&Select::new(&table)).await.unwrap_err();
    match err {
        DbError::Decode { column, .. } => assert_eq!(column, "p"),
        other => panic!("expected a decode error, got {other}"),
    }

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn numeric_keeps_values_beyond_28_digits() -> DbResult<()> {
    let Some(db) = open("numeric_keeps_values_beyond_28_digits") else {
        return Ok(());
    };
    let table = unique_table("num");
    db.create_table(
        &TableSchema::new(&table)
            .column("id", "integer")
            .column("amount", "numeric"),
    )
    .await?;

    let big = db.insert(&table, &assoc_row! { "amount" => "1e40" }).await?;
    let nan = db.insert(&table, &assoc_row! { "amount" => "NaN" }).await?;
    let rows = db
        .get(&table, &["id", "amount"], "", &["id"], None)
        .await?;
    assert_eq!(
        rows,
        vec![
            assoc_row! { "id" => big, "amount" => format!("1{}", "0".repeat(40)) },
            assoc_row! { "id" => nan, "amount" => "NaN" },
        ]
    );

    db.delete_table(&table).await?;
    db.close();
    Ok(())
}

#[tokio::test]
async fn unquoted_table_names_fold_to_lower_case() -> DbResult<()> {
    let Some(db) = open("unquoted_table_names_fold_to_lower_case") else {
        return Ok(());
    };
    let table = unique_table("fold").to_uppercase();
    db.create_table(&test_table(&table)).await?;

    assert_eq!(db.get_schema(&table).await?.columns.len(), 4);
    let id = db.insert(&table, &assoc_row! { "name" => "toto" }).await?;
    assert_eq!(count(&db, &table).await?, 1);
    db.delete(&table, &assoc_row! { "id" => id }).await?;
    assert_eq!(count(&db, &table).await?, 0);

    db.delete_table(&table).await?;
    assert!(db.get_schema(&table).await?.is_empty());
    db.close();
    Ok(())
}
