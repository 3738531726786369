//! The CRUD facade.

use crate::builder::{self, Select, SortDirection, Statement};
use crate::client::GenericClient;
use crate::config::{DbConfig, UpsertIdPolicy};
use crate::error::{DbError, DbResult};
use crate::row::{AssocRow, map_row, map_rows};
use crate::schema::{self, TableSchema};
use crate::value::Value;
use tokio_postgres::Row;

/// A handle over one executor: a connection, a transaction or a pool.
///
/// Every operation is a single round trip (two for the table DDL), fetches
/// the schema fresh when it needs one, and reports failures as [`DbError`].
///
/// ```ignore
/// let db = pgdyn::Db::open("postgres", &std::env::var("DATABASE_URL")?)?;
/// let id = db.insert("test", &pgdyn::assoc_row! { "name" => "toto" }).await?;
/// let rows = db.select(&pgdyn::Select::new("test").restriction(format!("id = {id}"))).await?;
/// db.close();
/// ```
#[derive(Debug)]
pub struct Db<C> {
    client: C,
    config: DbConfig,
}

impl<C: GenericClient> Db<C> {
    /// Wrap an executor with default configuration.
    pub fn new(client: C) -> Self {
        Self::with_config(client, DbConfig::default())
    }

    pub fn with_config(client: C, config: DbConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn log(&self, op: &'static str, stmt: &Statement) {
        if self.config.log_statements {
            tracing::debug!(
                target: "pgdyn.sql",
                op,
                param_count = stmt.params.len(),
                sql = %stmt.literal_sql,
            );
        }
    }

    fn log_failure(op: &'static str, stmt: &Statement, err: &DbError) {
        tracing::warn!(target: "pgdyn.sql", op, sql = %stmt.literal_sql, error = %err, "statement failed");
    }

    async fn run_query(&self, op: &'static str, stmt: &Statement) -> DbResult<Vec<Row>> {
        self.log(op, stmt);
        self.client
            .query(&stmt.sql, &stmt.params_ref())
            .await
            .inspect_err(|e| Self::log_failure(op, stmt, e))
    }

    async fn run_query_one(&self, op: &'static str, stmt: &Statement) -> DbResult<Row> {
        self.log(op, stmt);
        self.client
            .query_one(&stmt.sql, &stmt.params_ref())
            .await
            .inspect_err(|e| Self::log_failure(op, stmt, e))
    }

    async fn run_execute(&self, op: &'static str, stmt: &Statement) -> DbResult<u64> {
        self.log(op, stmt);
        self.client
            .execute(&stmt.sql, &stmt.params_ref())
            .await
            .inspect_err(|e| Self::log_failure(op, stmt, e))
    }

    // ==================== Catalog ====================

    /// Tables of the `public` schema.
    pub async fn list_tables(&self) -> DbResult<Vec<String>> {
        schema::list_tables(&self.client).await
    }

    /// Sequences of the `public` schema.
    pub async fn list_sequences(&self) -> DbResult<Vec<String>> {
        schema::list_sequences(&self.client).await
    }

    /// Live column types of `table`; empty for an unknown table.
    pub async fn get_schema(&self, table: &str) -> DbResult<TableSchema> {
        schema::fetch_schema(&self.client, table).await
    }

    // ==================== DDL ====================

    /// Create the table, then its companion sequence.
    ///
    /// The two statements are independent: if the sequence fails the table
    /// stays.
    pub async fn create_table(&self, schema: &TableSchema) -> DbResult<()> {
        let create = builder::build_create_table(schema, &self.config.id_column)?;
        let sequence = builder::build_create_sequence(&schema.name, &self.config.sequence_prefix)?;
        self.run_execute("create_table", &create).await?;
        self.run_execute("create_sequence", &sequence).await?;
        Ok(())
    }

    /// Drop the table, then its companion sequence if it exists.
    pub async fn delete_table(&self, table: &str) -> DbResult<()> {
        let drop = builder::build_drop_table(table)?;
        let sequence = builder::build_drop_sequence(table, &self.config.sequence_prefix)?;
        self.run_execute("drop_table", &drop).await?;
        self.run_execute("drop_sequence", &sequence).await?;
        Ok(())
    }

    pub async fn add_column(&self, table: &str, name: &str, sql_type: &str) -> DbResult<()> {
        let stmt = builder::build_add_column(table, name, sql_type)?;
        self.run_execute("add_column", &stmt).await.map(drop)
    }

    pub async fn delete_column(&self, table: &str, name: &str) -> DbResult<()> {
        let stmt = builder::build_drop_column(table, name)?;
        self.run_execute("drop_column", &stmt).await.map(drop)
    }

    // ==================== Reads ====================

    pub async fn select(&self, select: &Select) -> DbResult<Vec<AssocRow>> {
        let stmt = select.build()?;
        let rows = self.run_query("select", &stmt).await?;
        map_rows(&rows)
    }

    /// Positional form of [`Db::select`]; an empty restriction means none.
    pub async fn get(
        &self,
        table: &str,
        columns: &[&str],
        restriction: &str,
        sort_keys: &[&str],
        direction: Option<SortDirection>,
    ) -> DbResult<Vec<AssocRow>> {
        let mut select = Select::new(table)
            .columns(columns.iter().copied())
            .restriction(restriction)
            .order_by(sort_keys.iter().copied());
        select.direction = direction;
        self.select(&select).await
    }

    /// Run arbitrary SQL and map the result set.
    pub async fn query(&self, sql: &str) -> DbResult<Vec<AssocRow>> {
        let stmt = Statement {
            sql: sql.to_string(),
            params: Vec::new(),
            literal_sql: sql.to_string(),
        };
        let rows = self.run_query("query", &stmt).await?;
        map_rows(&rows)
    }

    // ==================== Writes ====================

    /// Insert `row` into `table` and return the generated id.
    pub async fn insert(&self, table: &str, row: &AssocRow) -> DbResult<i64> {
        let schema = self.get_schema(table).await?;
        let stmt = builder::build_insert(&schema, row, Some(&self.config.id_column))?;
        let returned = map_row(&self.run_query_one("insert", &stmt).await?)?;
        returned
            .get(&self.config.id_column)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                DbError::decode(
                    self.config.id_column.as_str(),
                    "generated id is not an integer",
                )
            })
    }

    /// Update the row identified by `row[id]`; returns the applied statement
    /// text. Zero matching rows is not an error.
    pub async fn update(&self, table: &str, row: &AssocRow) -> DbResult<String> {
        let schema = self.get_schema(table).await?;
        let stmt = builder::build_update(&schema, row, &self.config.id_column)?;
        let affected = self.run_execute("update", &stmt).await?;
        tracing::trace!(target: "pgdyn.sql", table, affected, "update applied");
        Ok(stmt.literal_sql)
    }

    /// Delete the row identified by `row[id]`; returns the applied statement
    /// text.
    pub async fn delete(&self, table: &str, row: &AssocRow) -> DbResult<String> {
        let stmt = builder::build_delete(table, row, &self.config.id_column)?;
        let affected = self.run_execute("delete", &stmt).await?;
        tracing::trace!(target: "pgdyn.sql", table, affected, "delete applied");
        Ok(stmt.literal_sql)
    }

    /// Insert when `row` has no usable id, update otherwise; returns the id.
    ///
    /// What counts as "no usable id" is [`DbConfig::upsert_policy`]. On the
    /// insert path the id key is dropped so the server generates one. No
    /// existence check is made before updating.
    pub async fn upsert(&self, table: &str, row: &AssocRow) -> DbResult<i64> {
        let id_column = self.config.id_column.as_str();
        let is_new = match row.get(id_column) {
            None => true,
            Some(id) => match self.config.upsert_policy {
                UpsertIdPolicy::ZeroIsNew => id.is_zero_or_empty(),
                UpsertIdPolicy::Presence => id.is_null(),
            },
        };

        if is_new {
            let mut fresh = row.clone();
            fresh.remove(id_column);
            return self.insert(table, &fresh).await;
        }

        let id = row
            .get(id_column)
            .and_then(Value::as_i64)
            .ok_or_else(|| DbError::validation(format!("'{id_column}' must be an integer")))?;
        self.update(table, row).await?;
        Ok(id)
    }
}

#[cfg(feature = "pool")]
impl Db<deadpool_postgres::Pool> {
    /// Open a pooled handle. Only the `postgres` driver is supported.
    pub fn open(driver: &str, database_url: &str) -> DbResult<Self> {
        Self::open_with_config(driver, database_url, DbConfig::default())
    }

    pub fn open_with_config(driver: &str, database_url: &str, config: DbConfig) -> DbResult<Self> {
        match driver {
            "postgres" | "postgresql" => {}
            other => {
                return Err(DbError::Connection(format!(
                    "unsupported driver '{other}', expected 'postgres'"
                )));
            }
        }
        let pool = crate::pool::create_pool(database_url, config.max_pool_size)?;
        Ok(Self::with_config(pool, config))
    }

    /// Close the pool; checked-out connections are released as they return.
    pub fn close(self) {
        self.client.close();
    }
}
