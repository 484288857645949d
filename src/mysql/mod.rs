//! `MySQL` driver glue built on `mysql_async`.
//!
//! Every new connection runs the session setup statements below before it
//! is handed out, so timestamps, strictness, and collation behave the same
//! across environments.

mod params;
mod query;

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder};

use crate::config::BackendConfig;
use crate::error::{DbError, DriverError};
use crate::row::Row;
use crate::types::SqlValue;

/// Session setup applied to each fresh connection, in order: UTC session
/// time zone, strict TRADITIONAL mode, and utf8mb4 with a deterministic
/// collation.
pub(crate) const INIT_STATEMENTS: &[&str] = &[
    "SET time_zone = '+0:00'",
    "SET sql_mode = 'TRADITIONAL'",
    "SET NAMES utf8mb4 COLLATE utf8mb4_unicode_ci",
];

/// Transport-level failures drop the connection; everything else is a
/// statement error the server reported.
pub(crate) fn classify(err: mysql_async::Error) -> DbError {
    if matches!(err, mysql_async::Error::Io(_) | mysql_async::Error::Driver(_)) {
        DbError::Connectivity(DriverError::Mysql(err))
    } else {
        DbError::Statement(DriverError::Mysql(err))
    }
}

pub(crate) async fn connect(config: &BackendConfig) -> Result<Conn, DbError> {
    let mut opts = OptsBuilder::default()
        .db_name(Some(config.schema.clone()))
        .user(config.user.clone())
        .pass(config.password.clone())
        .init(INIT_STATEMENTS.iter().map(ToString::to_string).collect::<Vec<_>>());
    opts = match config.socket_path() {
        Some(path) => opts.socket(Some(path.to_string())),
        None => opts.ip_or_hostname(config.host.clone()).tcp_port(config.port()),
    };

    Conn::new(opts)
        .await
        .map_err(|e| DbError::Connectivity(DriverError::Mysql(e)))
}

pub(crate) async fn query(
    conn: &mut Conn,
    sql: &str,
    params: &[SqlValue],
) -> Result<Vec<Row>, DbError> {
    let rows: Vec<mysql_async::Row> = conn
        .exec(sql, params::to_params(params))
        .await
        .map_err(classify)?;
    query::rows_from_driver(rows)
}

pub(crate) async fn execute(
    conn: &mut Conn,
    sql: &str,
    params: &[SqlValue],
) -> Result<u64, DbError> {
    conn.exec_drop(sql, params::to_params(params))
        .await
        .map_err(classify)?;
    Ok(conn.affected_rows())
}

/// Run an INSERT and read the generated id from the session's
/// last-insert-id counter.
pub(crate) async fn execute_insert(
    conn: &mut Conn,
    sql: &str,
    params: &[SqlValue],
) -> Result<i64, DbError> {
    conn.exec_drop(sql, params::to_params(params))
        .await
        .map_err(classify)?;
    let id = conn
        .last_insert_id()
        .ok_or_else(|| DbError::Execution("insert did not produce a generated id".into()))?;
    i64::try_from(id)
        .map_err(|_| DbError::Execution(format!("generated id {id} exceeds the i64 range")))
}

/// Execute per parameter set, reusing the connection's statement cache.
/// Not atomic: a failing set stops the loop and earlier sets stay applied.
pub(crate) async fn execute_many(
    conn: &mut Conn,
    sql: &str,
    param_sets: &[Vec<SqlValue>],
) -> Result<u64, DbError> {
    let mut total = 0;
    for set in param_sets {
        conn.exec_drop(sql, params::to_params(set))
            .await
            .map_err(classify)?;
        total += conn.affected_rows();
    }
    Ok(total)
}

/// Run a multi-statement script over the text protocol.
pub(crate) async fn execute_batch(conn: &mut Conn, script: &str) -> Result<(), DbError> {
    conn.query_drop(script).await.map_err(classify)
}
