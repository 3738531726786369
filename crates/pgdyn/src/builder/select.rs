use super::{SqlWriter, Statement};
use crate::error::{DbError, DbResult};
use crate::ident;
use std::str::FromStr;

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(DbError::validation(format!(
                "Invalid sort direction '{s}', expected ASC or DESC"
            ))),
        }
    }
}

/// A SELECT over one table.
///
/// The restriction is caller-owned raw SQL and is spliced verbatim; table,
/// column and sort-key names are validated identifiers.
///
/// ```ignore
/// let rows = db
///     .select(
///         &Select::new("test")
///             .columns(["id", "name"])
///             .restriction("id > 10")
///             .order_by(["name"])
///             .direction(SortDirection::Desc),
///     )
///     .await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub columns: Vec<String>,
    pub restriction: Option<String>,
    pub sort_keys: Vec<String>,
    pub direction: Option<SortDirection>,
}

impl Select {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Select-list entries; empty means `*`.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Raw WHERE predicate. An empty string means no restriction.
    pub fn restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restriction = Some(restriction.into());
        self
    }

    pub fn order_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Direction applied after the sort keys; ignored when there are none.
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn build(&self) -> DbResult<Statement> {
        let table = ident::ident(&self.table)?;
        let columns = if self.columns.is_empty() {
            vec!["*"]
        } else {
            self.columns
                .iter()
                .map(|c| ident::column_or_star(c))
                .collect::<DbResult<Vec<_>>>()?
        };
        let sort_keys = self
            .sort_keys
            .iter()
            .map(|k| ident::ident(k))
            .collect::<DbResult<Vec<_>>>()?;

        let mut w = SqlWriter::new("SELECT ");
        w.push(&columns.join(", "));
        w.push(" FROM ").push(table);

        if let Some(restriction) = self.restriction.as_deref().map(str::trim) {
            if !restriction.is_empty() {
                w.push(" WHERE ").push(restriction);
            }
        }

        if !sort_keys.is_empty() {
            w.push(" ORDER BY ").push(&sort_keys.join(", "));
            if let Some(dir) = self.direction {
                w.push(" ").push(dir.as_sql());
            }
        }

        Ok(w.finish())
    }
}
