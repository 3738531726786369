//! Statement text assembly.
//!
//! Builders take already-validated pieces (identifiers, a [`TableSchema`],
//! an [`AssocRow`]) and produce a [`Statement`]: parameterized SQL plus the
//! bound values, and the same statement with values inlined as literals.
//!
//! - Identifiers are allow-listed via [`crate::ident`].
//! - Lists are joined, never built with a trailing separator.
//! - UPDATE and DELETE require an id; UPDATE requires a SET list.
//!
//! [`TableSchema`]: crate::TableSchema
//! [`AssocRow`]: crate::AssocRow

pub mod ddl;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use ddl::{
    build_add_column, build_create_sequence, build_create_table, build_drop_column,
    build_drop_sequence, build_drop_table, sequence_name,
};
pub use delete::build_delete;
pub use insert::build_insert;
pub use select::{Select, SortDirection};
pub use update::build_update;

use crate::classify::{ValueClass, render_literal};
use crate::value::Value;
use std::fmt;
use tokio_postgres::types::ToSql;

/// A fully assembled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL with `$1, $2, ...` placeholders; this is what gets executed.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Value>,
    /// The same statement with every value rendered inline by the classifier.
    pub literal_sql: String,
}

impl Statement {
    /// Parameters in the shape `GenericClient` expects.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal_sql)
    }
}

/// Writes the placeholder form and the literal form of a statement in one
/// pass, so the two can never drift apart.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    literal: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new(initial: &str) -> Self {
        Self {
            sql: initial.to_string(),
            literal: initial.to_string(),
            params: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self.literal.push_str(s);
        self
    }

    pub(crate) fn push_value(&mut self, value: Value, class: ValueClass) -> &mut Self {
        self.literal.push_str(&render_literal(&value, class));
        self.params.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// Push `items` separated by `sep`, writing each one with `write`.
    pub(crate) fn push_joined<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        sep: &str,
        mut write: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            write(self, item);
        }
        self
    }

    pub(crate) fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            literal_sql: self.literal,
        }
    }
}
