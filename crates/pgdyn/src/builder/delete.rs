use super::{SqlWriter, Statement};
use crate::classify::ValueClass;
use crate::error::{DbError, DbResult};
use crate::ident;
use crate::row::AssocRow;

/// `DELETE FROM <table> WHERE <id_column> = <id>`.
///
/// Only the id of `row` matters; other keys are ignored. A row without an id
/// is rejected instead of producing an unrestricted DELETE.
pub fn build_delete(table: &str, row: &AssocRow, id_column: &str) -> DbResult<Statement> {
    let table = ident::table_ident(table)?;
    let id_col = ident::ident(id_column)?;

    let Some(id) = row.get(id_column).filter(|v| !v.is_null()) else {
        return Err(DbError::validation(format!(
            "DELETE on {table} requires a non-null '{id_column}'"
        )));
    };

    let mut w = SqlWriter::new("DELETE FROM ");
    w.push(table).push(" WHERE ").push(id_col).push(" = ");
    w.push_value(id.clone(), ValueClass::Raw);
    Ok(w.finish())
}
