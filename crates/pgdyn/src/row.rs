//! Result rows as associative maps.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::collections::BTreeMap;
use tokio_postgres::Row;

/// One table row without a compile-time shape: column name -> value.
///
/// Ordered by column name so that statements built from it are
/// deterministic.
pub type AssocRow = BTreeMap<String, Value>;

/// Decode every column of `row` into a [`Value`].
///
/// Fails on the first column that cannot be decoded; a partially populated
/// row is never returned.
pub fn map_row(row: &Row) -> DbResult<AssocRow> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = row
                .try_get::<_, Value>(idx)
                .map_err(|e| DbError::decode(column.name(), e.to_string()))?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

/// Decode a whole result set; the first bad row aborts the sequence.
pub fn map_rows(rows: &[Row]) -> DbResult<Vec<AssocRow>> {
    rows.iter().map(map_row).collect()
}

/// Build an [`AssocRow`] from literal pairs.
///
/// ```ignore
/// let row = pgdyn::assoc_row! { "name" => "toto", "score" => 3 };
/// ```
#[macro_export]
macro_rules! assoc_row {
    () => { $crate::AssocRow::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::AssocRow::new();
        $(row.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        row
    }};
}

#[cfg(test)]
mod tests {
    use crate::Value;

    #[test]
    fn assoc_row_macro_converts_values() {
        let row = assoc_row! { "name" => "toto", "score" => 3, "gone" => Option::<i32>::None };
        assert_eq!(row.len(), 3);
        assert_eq!(row["name"], Value::Text("toto".into()));
        assert_eq!(row["score"], Value::Int(3));
        assert!(row["gone"].is_null());
    }

    #[test]
    fn assoc_row_macro_empty() {
        let row = assoc_row! {};
        assert!(row.is_empty());
    }
}
