use super::{SqlWriter, Statement};
use crate::classify::{ValueClass, classify_column};
use crate::error::{DbError, DbResult};
use crate::ident;
use crate::row::AssocRow;
use crate::schema::TableSchema;

/// `UPDATE <schema.name> SET a = .., b = .. WHERE <id_column> = <id>`.
///
/// The id is taken out of `row` and only used in the WHERE clause; it is
/// always rendered raw in the literal form.
pub fn build_update(schema: &TableSchema, row: &AssocRow, id_column: &str) -> DbResult<Statement> {
    let table = ident::table_ident(&schema.name)?;
    let id_col = ident::ident(id_column)?;

    let id = match row.get(id_column) {
        Some(v) if !v.is_null() => v.clone(),
        _ => {
            return Err(DbError::validation(format!(
                "UPDATE on {table} requires a non-null '{id_column}'"
            )));
        }
    };

    let assignments = row
        .iter()
        .filter(|(column, _)| column.as_str() != id_column)
        .map(|(column, value)| Ok::<_, DbError>((ident::ident(column)?, column, value)))
        .collect::<DbResult<Vec<_>>>()?;
    if assignments.is_empty() {
        return Err(DbError::validation(format!(
            "UPDATE on {table} has no columns to SET"
        )));
    }

    let mut w = SqlWriter::new("UPDATE ");
    w.push(table).push(" SET ");
    w.push_joined(assignments, ", ", |w, (col_sql, column, value)| {
        w.push(col_sql).push(" = ");
        w.push_value(value.clone(), classify_column(schema, column));
    });
    w.push(" WHERE ").push(id_col).push(" = ");
    w.push_value(id, ValueClass::Raw);

    Ok(w.finish())
}
