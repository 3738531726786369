//! CREATE / ALTER / DROP statements.
//!
//! Every table gets a companion sequence named `<prefix><table>` (`sq_` by
//! default). It is created and dropped alongside the table whether or not
//! the table uses it; external tooling keys off its existence.

use super::{SqlWriter, Statement};
use crate::error::DbResult;
use crate::ident;
use crate::schema::TableSchema;

/// Name of the companion sequence of `table` (a single unquoted segment).
pub fn sequence_name(table: &str, prefix: &str) -> String {
    format!("{prefix}{table}")
}

/// `CREATE TABLE t (id SERIAL PRIMARY KEY, col type, ...)`.
///
/// The `id_column`, when present, is emitted first and always becomes
/// `SERIAL PRIMARY KEY` whatever type it was declared with.
pub fn build_create_table(schema: &TableSchema, id_column: &str) -> DbResult<Statement> {
    let table = ident::table_ident(&schema.name)?;

    let mut defs = Vec::with_capacity(schema.columns.len());
    if schema.columns.contains_key(id_column) {
        defs.push(format!("{} SERIAL PRIMARY KEY", ident::ident(id_column)?));
    }
    for (name, sql_type) in &schema.columns {
        if name == id_column {
            continue;
        }
        defs.push(format!(
            "{} {}",
            ident::ident(name)?,
            ident::type_descriptor(sql_type)?
        ));
    }

    let mut w = SqlWriter::new("CREATE TABLE ");
    w.push(table).push(" (").push(&defs.join(", ")).push(")");
    Ok(w.finish())
}

/// `CREATE SEQUENCE IF NOT EXISTS <prefix><table>`.
pub fn build_create_sequence(table: &str, prefix: &str) -> DbResult<Statement> {
    let seq = sequence_name(ident::table_ident(table)?, prefix);
    let mut w = SqlWriter::new("CREATE SEQUENCE IF NOT EXISTS ");
    w.push(ident::ident(&seq)?);
    Ok(w.finish())
}

/// `DROP TABLE <table>`.
pub fn build_drop_table(table: &str) -> DbResult<Statement> {
    let mut w = SqlWriter::new("DROP TABLE ");
    w.push(ident::table_ident(table)?);
    Ok(w.finish())
}

/// `DROP SEQUENCE IF EXISTS <prefix><table>`; a missing sequence is fine.
pub fn build_drop_sequence(table: &str, prefix: &str) -> DbResult<Statement> {
    let seq = sequence_name(ident::table_ident(table)?, prefix);
    let mut w = SqlWriter::new("DROP SEQUENCE IF EXISTS ");
    w.push(ident::ident(&seq)?);
    Ok(w.finish())
}

/// `ALTER TABLE <table> ADD <column> <type>`.
pub fn build_add_column(table: &str, column: &str, sql_type: &str) -> DbResult<Statement> {
    let mut w = SqlWriter::new("ALTER TABLE ");
    w.push(ident::table_ident(table)?)
        .push(" ADD ")
        .push(ident::ident(column)?)
        .push(" ")
        .push(ident::type_descriptor(sql_type)?);
    Ok(w.finish())
}

/// `ALTER TABLE <table> DROP <column>`.
pub fn build_drop_column(table: &str, column: &str) -> DbResult<Statement> {
    let mut w = SqlWriter::new("ALTER TABLE ");
    w.push(ident::table_ident(table)?)
        .push(" DROP ")
        .push(ident::ident(column)?);
    Ok(w.finish())
}
