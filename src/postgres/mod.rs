//! `PostgreSQL` driver glue: dialing, statement execution, and mapping
//! driver rows/errors onto the crate's generic types.

mod params;
mod query;

use tokio_postgres::{Client, NoTls};
use tracing::error;

use crate::config::BackendConfig;
use crate::error::{DbError, DriverError};
use crate::row::Row;
use crate::types::SqlValue;

pub(crate) use query::extract_value;

/// Split a driver error into the two buckets callers care about: transport
/// trouble versus a server-reported statement failure.
pub(crate) fn classify(err: tokio_postgres::Error) -> DbError {
    if err.is_closed() {
        DbError::Connectivity(DriverError::Postgres(err))
    } else {
        DbError::Statement(DriverError::Postgres(err))
    }
}

/// Dial the server and spawn the connection driver task. The task exits on
/// its own when the returned client is dropped.
pub(crate) async fn connect(config: &BackendConfig) -> Result<Client, DbError> {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host);
    pg.port(config.port());
    pg.dbname(&config.schema);
    if let Some(user) = &config.user {
        pg.user(user);
    }
    if let Some(password) = &config.password {
        pg.password(password);
    }

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|e| DbError::Connectivity(DriverError::Postgres(e)))?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(error = %err, "postgres connection task exited");
        }
    });
    Ok(client)
}

pub(crate) async fn query(
    client: &Client,
    sql: &str,
    params: &[SqlValue],
) -> Result<Vec<Row>, DbError> {
    let stmt = client.prepare(sql).await.map_err(classify)?;
    let refs = params::as_refs(params);
    let rows = client.query(&stmt, &refs).await.map_err(classify)?;
    query::rows_from_statement(&stmt, &rows)
}

pub(crate) async fn execute(
    client: &Client,
    sql: &str,
    params: &[SqlValue],
) -> Result<u64, DbError> {
    let refs = params::as_refs(params);
    client.execute(sql, &refs).await.map_err(classify)
}

/// Run an INSERT carrying a `RETURNING` clause and read the generated id
/// from the first column of the returned row.
pub(crate) async fn execute_insert(
    client: &Client,
    sql: &str,
    params: &[SqlValue],
) -> Result<i64, DbError> {
    let stmt = client.prepare(sql).await.map_err(classify)?;
    let refs = params::as_refs(params);
    let rows = client.query(&stmt, &refs).await.map_err(classify)?;
    let row = rows.first().ok_or_else(|| {
        DbError::Execution("insert returned no generated id (missing RETURNING clause?)".into())
    })?;
    match extract_value(row, 0)? {
        SqlValue::Int(id) => Ok(id),
        other => Err(DbError::Execution(format!(
            "generated id has unexpected type: {other:?}"
        ))),
    }
}

/// Prepare once, execute per parameter set. Not atomic: a failing set stops
/// the loop and earlier sets stay applied.
pub(crate) async fn execute_many(
    client: &Client,
    sql: &str,
    param_sets: &[Vec<SqlValue>],
) -> Result<u64, DbError> {
    let stmt = client.prepare(sql).await.map_err(classify)?;
    let mut total = 0;
    for set in param_sets {
        let refs = params::as_refs(set);
        total += client.execute(&stmt, &refs).await.map_err(classify)?;
    }
    Ok(total)
}

pub(crate) async fn execute_batch(client: &Client, script: &str) -> Result<(), DbError> {
    client.batch_execute(script).await.map_err(classify)
}
