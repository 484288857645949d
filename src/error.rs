use thiserror::Error;

/// Error surfaced by one of the underlying drivers, preserved verbatim so
/// callers can still reach SQLSTATE codes and server messages.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    Mysql(#[from] mysql_async::Error),
}

/// Unified error type for every operation in this crate.
///
/// Driver failures are split into two buckets: [`DbError::Connectivity`] for
/// transport-level trouble (the cached handle is dropped and the next call
/// redials), and [`DbError::Statement`] for errors the server reported about
/// the statement itself (the connection stays cached).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("connectivity failure: {0}")]
    Connectivity(#[source] DriverError),

    #[error("statement failed: {0}")]
    Statement(#[source] DriverError),

    #[error("query returned more than one row: {0}")]
    MultipleRows(String),

    #[error("schema must be specified: {0} schemas registered")]
    AmbiguousSchema(usize),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("execution error: {0}")]
    Execution(String),
}

impl DbError {
    /// True when the failure indicates the backend is unreachable or the
    /// connection is no longer usable.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, DbError::Connectivity(_))
    }
}
