//! Live schema lookups against `information_schema`.
//!
//! Nothing here is cached: every call is a fresh round trip, so the result
//! always reflects the catalog at call time.

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::ident;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_postgres::Row;

/// Column name -> normalized type descriptor for one table.
///
/// This is also the JSON fixture shape used to create tables:
///
/// ```json
/// { "name": "test", "columns": { "id": "integer", "name": "varchar(50)" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column insertion.
    pub fn column(mut self, name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.columns.insert(name.into(), sql_type.into());
        self
    }

    /// Declared type of `column`, if the table has it.
    pub fn column_type(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// A table that does not exist comes back with no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

const COLUMNS_SQL: &str = "SELECT column_name::varchar AS name, \
     REPLACE(REPLACE(data_type, 'character varying', 'varchar'), 'character', 'char') \
     || COALESCE('(' || character_maximum_length || ')', '') AS type \
     FROM information_schema.columns WHERE table_name = $1::text";

const TABLES_SQL: &str = "SELECT table_name::varchar AS name FROM information_schema.tables \
     WHERE table_schema = 'public' ORDER BY table_name";

const SEQUENCES_SQL: &str = "SELECT sequence_name::varchar AS name FROM information_schema.sequences \
     WHERE sequence_schema = 'public' ORDER BY sequence_name";

/// Normalize a catalog `data_type` the way [`fetch_schema`] does server-side:
/// `character varying` -> `varchar`, `character` -> `char`, plus a `(N)`
/// suffix when the catalog reports a maximum length.
pub fn normalize_type(data_type: &str, max_length: Option<i32>) -> String {
    let mut ty = data_type
        .replace("character varying", "varchar")
        .replace("character", "char");
    if let Some(n) = max_length {
        ty.push_str(&format!("({n})"));
    }
    ty
}

fn text_column(row: &Row, column: &str) -> DbResult<String> {
    row.try_get::<_, String>(column)
        .map_err(|e| DbError::decode(column, e.to_string()))
}

/// Fetch the column types of `table`.
///
/// An unknown table is not an error; it yields an empty column map. The
/// name is folded to lower case the way the server folds unquoted names.
pub async fn fetch_schema<C: GenericClient>(client: &C, table: &str) -> DbResult<TableSchema> {
    let folded = ident::table_ident(table)?.to_ascii_lowercase();
    let rows = client.query(COLUMNS_SQL, &[&folded]).await?;
    let mut schema = TableSchema::new(table);
    for row in &rows {
        schema
            .columns
            .insert(text_column(row, "name")?, text_column(row, "type")?);
    }
    tracing::trace!(target: "pgdyn.sql", table, columns = schema.columns.len(), "fetched schema");
    Ok(schema)
}

async fn names<C: GenericClient>(client: &C, sql: &str) -> DbResult<Vec<String>> {
    client
        .query(sql, &[])
        .await?
        .iter()
        .map(|row| text_column(row, "name"))
        .collect()
}

/// Tables of the `public` schema, ordered by name.
pub async fn list_tables<C: GenericClient>(client: &C) -> DbResult<Vec<String>> {
    names(client, TABLES_SQL).await
}

/// Sequences of the `public` schema, ordered by name.
pub async fn list_sequences<C: GenericClient>(client: &C) -> DbResult<Vec<String>> {
    names(client, SEQUENCES_SQL).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_character_synonyms() {
        assert_eq!(normalize_type("character varying", Some(50)), "varchar(50)");
        assert_eq!(normalize_type("character", Some(3)), "char(3)");
        assert_eq!(normalize_type("integer", None), "integer");
        assert_eq!(normalize_type("text", None), "text");
    }

    #[test]
    fn normalize_keeps_unrelated_types() {
        assert_eq!(
            normalize_type("timestamp without time zone", None),
            "timestamp without time zone"
        );
        assert_eq!(normalize_type("date", None), "date");
    }

    #[test]
    fn schema_fixture_json_shape() {
        let schema: TableSchema = serde_json::from_str(
            r#"{"name":"test","columns":{"id":"integer","name":"varchar(50)"}}"#,
        )
        .unwrap();
        assert_eq!(schema.name, "test");
        assert_eq!(schema.column_type("name"), Some("varchar(50)"));
        assert_eq!(schema.column_type("missing"), None);
    }

    #[test]
    fn schema_without_columns_is_empty() {
        let schema: TableSchema = serde_json::from_str(r#"{"name":"ghost"}"#).unwrap();
        assert!(schema.is_empty());
    }
}
