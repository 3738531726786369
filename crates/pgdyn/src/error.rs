//! Errors returned by every `pgdyn` operation.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Failure of a schema lookup, statement build, execution or row decode.
#[derive(Debug, Error)]
pub enum DbError {
    /// Bad URL or unsupported driver when opening a handle.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected a statement.
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A statement that must return a row returned none.
    #[error("Not found: {0}")]
    NotFound(String),

    /// SQLSTATE 23505.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// SQLSTATE 23503.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// SQLSTATE 23514.
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// A result column has a type [`Value`](crate::Value) cannot hold.
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Input rejected before anything was sent: bad identifier or type
    /// descriptor, missing id, nothing to SET.
    #[error("Validation error: {0}")]
    Validation(String),

    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl DbError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Any of the three constraint variants.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation(_) | Self::ForeignKeyViolation(_) | Self::CheckViolation(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// SQLSTATE of a server-side [`DbError::Query`], e.g. `42P01` for an
    /// unknown table.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Query(err) => err.code().map(|c| c.code()),
            _ => None,
        }
    }

    /// Map constraint SQLSTATEs to their typed variants; everything else
    /// stays a [`DbError::Query`].
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        let Some(db_err) = err.as_db_error() else {
            return Self::Query(err);
        };
        let detail = format!(
            "{}: {}",
            db_err.constraint().unwrap_or("unknown"),
            db_err.message()
        );
        let code = db_err.code().clone();
        match code.code() {
            "23505" => Self::UniqueViolation(detail),
            "23503" => Self::ForeignKeyViolation(detail),
            "23514" => Self::CheckViolation(detail),
            _ => Self::Query(err),
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_column() {
        let err = DbError::decode("label", "unsupported type");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'label': unsupported type"
        );
    }

    #[test]
    fn predicates_match_variants() {
        assert!(DbError::validation("x").is_validation());
        assert!(DbError::not_found("x").is_not_found());
        assert!(!DbError::not_found("x").is_unique_violation());
        assert!(DbError::CheckViolation("c".into()).is_constraint_violation());
        assert!(!DbError::validation("x").is_constraint_violation());
    }

    #[test]
    fn non_query_errors_have_no_sqlstate() {
        assert_eq!(DbError::validation("x").sqlstate(), None);
    }
}
