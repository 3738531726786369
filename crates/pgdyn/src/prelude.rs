//! Convenient imports for typical `pgdyn` usage.
//!
//! ```ignore
//! use pgdyn::prelude::*;
//! ```

pub use crate::{
    AssocRow, Db, DbConfig, DbError, DbResult, GenericClient, Select, SortDirection, TableSchema,
    UpsertIdPolicy, Value, assoc_row,
};

#[cfg(feature = "pool")]
pub use crate::create_pool;
