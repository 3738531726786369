use super::{SqlWriter, Statement};
use crate::classify::classify_column;
use crate::error::DbResult;
use crate::ident;
use crate::row::AssocRow;
use crate::schema::TableSchema;

/// `INSERT INTO <schema.name> (cols) VALUES (...) [RETURNING <col>]`.
///
/// Every key of `row` becomes a column; values are classified against
/// `schema` for the literal form. An empty row inserts `DEFAULT VALUES`.
pub fn build_insert(
    schema: &TableSchema,
    row: &AssocRow,
    returning: Option<&str>,
) -> DbResult<Statement> {
    let table = ident::table_ident(&schema.name)?;
    let columns = row
        .keys()
        .map(|c| ident::ident(c))
        .collect::<DbResult<Vec<_>>>()?;
    let returning = returning.map(ident::ident).transpose()?;

    let mut w = SqlWriter::new("INSERT INTO ");
    w.push(table);

    if row.is_empty() {
        w.push(" DEFAULT VALUES");
    } else {
        w.push(" (").push(&columns.join(", ")).push(") VALUES (");
        w.push_joined(row, ", ", |w, (column, value)| {
            w.push_value(value.clone(), classify_column(schema, column));
        });
        w.push(")");
    }

    if let Some(col) = returning {
        w.push(" RETURNING ").push(col);
    }

    Ok(w.finish())
}
