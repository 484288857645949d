//! Async access layer for `PostgreSQL` and `MySQL` with per-context
//! connection caching.
//!
//! The pieces fit together like this: a [`ConnectionRegistry`] owns one
//! lazily-dialed [`DbConnection`] per schema for a single execution
//! context; statements run through the [`DatabaseExecutor`] trait with
//! portable `?` placeholders and [`SqlValue`] parameters; results come back
//! as generic [`Row`]s or mapped types via [`FromRow`]. On top of that sit
//! the [`changeset`] statement generators and the [`ledger`]
//! schema-migration table.
//!
//! ```rust,no_run
//! use sql_broker::prelude::*;
//!
//! # async fn demo() -> Result<(), DbError> {
//! let config = BackendConfig::new(BackendKind::Postgres, "localhost", "app")
//!     .with_credentials("app", "secret");
//! let mut registry = ConnectionRegistry::with_configs([config]);
//!
//! let db = registry.connection(None).await?;
//! let row = db
//!     .get("SELECT * FROM widgets WHERE widget_id = ?", &[SqlValue::Int(1)])
//!     .await?;
//! # let _ = row;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "postgres", feature = "mysql")))]
compile_error!("at least one backend feature (`postgres` or `mysql`) must be enabled");

pub mod changeset;
pub mod config;
pub mod connection;
pub mod error;
pub mod ledger;
pub mod prelude;
pub mod registry;
pub mod row;
pub mod translation;
pub mod types;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "test-utils-postgres")]
pub mod test_utils;

#[cfg(test)]
mod test_support;

pub use changeset::{BuiltStatement, Changeset, FieldValue, build_insert, build_update};
pub use config::BackendConfig;
pub use connection::{DatabaseExecutor, DbConnection};
pub use error::{DbError, DriverError};
pub use ledger::SqlDiff;
pub use registry::ConnectionRegistry;
pub use row::{Columns, FromRow, Row, fetch_by_id, index_rows_by_key, scan_by_key};
pub use types::{BackendKind, RowKey, SqlValue};
