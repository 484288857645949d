use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::translation::PlaceholderStyle;

/// A single cell of a result row, and the type bound as a query parameter.
///
/// Both backends decode into and encode out of this one enum, so code built
/// on top of the broker never touches driver types:
/// ```rust
/// use sql_broker::prelude::*;
///
/// let bound = [SqlValue::Text("alice".into()), SqlValue::Int(3)];
/// # let _ = bound;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    Bool(bool),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// SQL NULL
    Null,
    /// JSON document
    Json(JsonValue),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl SqlValue {
    /// True for the `Null` variant only.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans stored as `0`/`1` integers (MySQL `TINYINT(1)` columns) are
    /// coerced.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(0) => Some(false),
            SqlValue::Int(1) => Some(true),
            _ => None,
        }
    }

    /// Timestamps rendered as text (`YYYY-MM-DD HH:MM:SS` with optional
    /// fractional seconds) are parsed.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            SqlValue::Int(value) => {
                #[allow(clippy::cast_precision_loss)]
                Some(*value as f64)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Project this value onto the hashable [`RowKey`] subset, used when
    /// indexing rows by a column. `Float` and `Json` values have no stable
    /// key form and return `None`.
    #[must_use]
    pub fn as_key(&self) -> Option<RowKey> {
        match self {
            SqlValue::Int(value) => Some(RowKey::Int(*value)),
            SqlValue::Text(value) => Some(RowKey::Text(value.clone())),
            SqlValue::Bool(value) => Some(RowKey::Bool(*value)),
            SqlValue::Timestamp(value) => Some(RowKey::Timestamp(*value)),
            SqlValue::Blob(bytes) => Some(RowKey::Blob(bytes.clone())),
            SqlValue::Null => Some(RowKey::Null),
            SqlValue::Float(_) | SqlValue::Json(_) => None,
        }
    }
}

/// Hashable subset of [`SqlValue`], usable as a `HashMap` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Blob(Vec<u8>),
    Null,
}

/// Backend flavor a configuration points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[cfg(feature = "postgres")]
    Postgres,
    #[cfg(feature = "mysql")]
    Mysql,
}

impl BackendKind {
    /// Port used when the configuration leaves it unset.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => 5432,
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => 3306,
        }
    }

    /// Placeholder dialect the backend's wire protocol expects.
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => PlaceholderStyle::Numbered,
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => PlaceholderStyle::Positional,
        }
    }

    /// Whether `INSERT ... RETURNING` is the way to obtain generated ids.
    /// When false, the id comes from the session's last-insert-id counter.
    #[must_use]
    pub fn supports_insert_returning(self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => true,
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => false,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => "postgres",
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => "mysql",
        };
        f.write_str(name)
    }
}
