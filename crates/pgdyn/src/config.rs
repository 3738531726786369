//! Runtime configuration for [`Db`](crate::Db).

use crate::error::{DbError, DbResult};

/// How `upsert` decides between INSERT and UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpsertIdPolicy {
    /// Missing, `NULL`, `0` or blank id means "new row". This is the
    /// historical behaviour, and it makes a legitimate id of 0 unreachable.
    #[default]
    ZeroIsNew,
    /// Only a missing or `NULL` id means "new row"; any other value,
    /// including 0, updates.
    Presence,
}

/// Configuration for `Db`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Prefix of each table's companion sequence.
    pub sequence_prefix: String,
    /// Primary key column used by insert/update/delete/upsert and
    /// special-cased by CREATE TABLE.
    pub id_column: String,
    /// Insert-vs-update discriminator for `upsert`.
    pub upsert_policy: UpsertIdPolicy,
    /// Max connections when the handle owns a pool.
    pub max_pool_size: usize,
    /// Emit a `DEBUG` event for every executed statement.
    pub log_statements: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            sequence_prefix: "sq_".to_string(),
            id_column: "id".to_string(),
            upsert_policy: UpsertIdPolicy::default(),
            max_pool_size: 16,
            log_statements: true,
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `PGDYN_SEQUENCE_PREFIX`, `PGDYN_ID_COLUMN` and
    /// `PGDYN_POOL_SIZE`. A `.env` file is loaded first when present.
    pub fn from_env() -> DbResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = Self::default();
        if let Some(prefix) = lookup("PGDYN_SEQUENCE_PREFIX") {
            config.sequence_prefix = prefix;
        }
        if let Some(id) = lookup("PGDYN_ID_COLUMN") {
            config.id_column = id;
        }
        if let Some(size) = lookup("PGDYN_POOL_SIZE") {
            config.max_pool_size = size.trim().parse().map_err(|_| {
                DbError::validation(format!("PGDYN_POOL_SIZE must be a positive integer, got '{size}'"))
            })?;
        }
        Ok(config)
    }

    /// Set the companion sequence prefix.
    pub fn sequence_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sequence_prefix = prefix.into();
        self
    }

    /// Set the id column.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Set the upsert policy.
    pub fn upsert_policy(mut self, policy: UpsertIdPolicy) -> Self {
        self.upsert_policy = policy;
        self
    }

    /// Set the pool size used by `Db::open`.
    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Enable or disable per-statement debug events.
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }
}
