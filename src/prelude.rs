//! Convenient imports for common functionality.

pub use crate::changeset::{
    BuiltStatement, Changeset, FieldValue, SplitChangeset, build_insert, build_update,
};
pub use crate::config::BackendConfig;
pub use crate::connection::{DatabaseExecutor, DbConnection};
pub use crate::error::{DbError, DriverError};
pub use crate::ledger::SqlDiff;
pub use crate::registry::ConnectionRegistry;
pub use crate::row::{Columns, FromRow, Row, fetch_by_id, index_rows_by_key, scan_by_key};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{BackendKind, RowKey, SqlValue};
