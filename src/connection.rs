use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::BackendConfig;
use crate::error::DbError;
use crate::row::{FromRow, Row};
use crate::translation::translate_placeholders;
use crate::types::{BackendKind, SqlValue};

#[cfg(feature = "mysql")]
use crate::mysql;
#[cfg(feature = "postgres")]
use crate::postgres;

/// Common interface over anything that can run statements: a live
/// [`DbConnection`] or a test double.
///
/// Statements are written with portable `?` placeholders; implementations
/// translate them into the backend's dialect. Values are always bound as
/// parameters, never spliced into the SQL text.
#[async_trait]
pub trait DatabaseExecutor {
    fn backend_kind(&self) -> BackendKind;

    /// Executes a SELECT (or anything else producing a result set) and
    /// returns the rows.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError>;

    /// Executes a DML statement and returns the number of rows affected.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError>;

    /// Executes an INSERT and returns the generated id. On `PostgreSQL` the
    /// statement must carry a `RETURNING` clause whose first column is the
    /// id; on `MySQL` the session's last-insert-id counter is read instead.
    /// [`build_insert`](crate::changeset::build_insert) emits the right
    /// shape for the backend at hand.
    async fn execute_insert(&mut self, sql: &str, params: &[SqlValue]) -> Result<i64, DbError>;

    /// Executes one statement once per parameter set and returns the total
    /// number of rows affected. Sets run independently, so a failure leaves
    /// earlier sets applied.
    async fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<SqlValue>],
    ) -> Result<u64, DbError>;

    /// Executes a multi-statement script. No parameters are supported.
    async fn execute_batch(&mut self, script: &str) -> Result<(), DbError>;

    /// Executes a query expected to match at most one row.
    ///
    /// # Errors
    ///
    /// [`DbError::MultipleRows`] when the query matches more than one row;
    /// a query matching none is `Ok(None)`.
    async fn get(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DbError> {
        let mut rows = self.query(sql, params).await?;
        if rows.len() > 1 {
            return Err(DbError::MultipleRows(sql.to_string()));
        }
        Ok(rows.pop())
    }

    /// [`query`](DatabaseExecutor::query) plus row mapping.
    async fn query_as<T>(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Send,
    {
        let rows = self.query(sql, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// [`get`](DatabaseExecutor::get) plus row mapping.
    async fn get_as<T>(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<T>, DbError>
    where
        T: FromRow + Send,
    {
        match self.get(sql, params).await? {
            Some(row) => Ok(Some(T::from_row(&row)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
enum Handle {
    #[cfg(feature = "postgres")]
    Postgres(tokio_postgres::Client),
    #[cfg(feature = "mysql")]
    Mysql(mysql_async::Conn),
}

/// One backend connection with lazy dialing and idle recycling.
///
/// The handle behind a `DbConnection` may die and be redialed at any point;
/// callers hold the `DbConnection` itself, usually through a
/// [`ConnectionRegistry`](crate::registry::ConnectionRegistry). Every
/// statement runs in its own implicit transaction (autocommit).
#[derive(Debug)]
pub struct DbConnection {
    config: BackendConfig,
    handle: Option<Handle>,
    last_use: Instant,
}

impl DbConnection {
    /// Create the connection and attempt the first dial. A failed dial is
    /// logged, not returned: the next statement retries and surfaces the
    /// error to its caller.
    pub async fn connect(config: BackendConfig) -> Self {
        let mut conn = Self {
            config,
            handle: None,
            last_use: Instant::now(),
        };
        if let Err(err) = conn.reconnect().await {
            error!(
                schema = %conn.config.schema,
                error = %err,
                "initial dial failed; will retry on next use"
            );
        }
        conn
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.config.kind
    }

    /// Whether a live handle is currently held. A `true` here is a
    /// snapshot, not a guarantee the server still agrees.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some() && !self.handle_is_closed()
    }

    /// Drop the current handle, if any. The next statement redials.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!(schema = %self.config.schema, "closed connection");
        }
    }

    /// Tear down and redial unconditionally.
    ///
    /// # Errors
    ///
    /// [`DbError::Connectivity`] when the backend cannot be reached.
    pub async fn reconnect(&mut self) -> Result<(), DbError> {
        self.close();
        let handle = match self.config.kind {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => Handle::Postgres(postgres::connect(&self.config).await?),
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => Handle::Mysql(mysql::connect(&self.config).await?),
        };
        self.handle = Some(handle);
        self.last_use = Instant::now();
        debug!(
            schema = %self.config.schema,
            kind = %self.config.kind,
            "connected"
        );
        Ok(())
    }

    /// Reads the backend's current time via `SELECT NOW()`.
    ///
    /// # Errors
    ///
    /// Propagates query failures; [`DbError::Execution`] when the backend
    /// answers with something that is not a timestamp.
    pub async fn server_now(&mut self) -> Result<chrono::NaiveDateTime, DbError> {
        let row = self
            .get("SELECT NOW()", &[])
            .await?
            .ok_or_else(|| DbError::Execution("SELECT NOW() returned no rows".into()))?;
        row.get_by_index(0)
            .and_then(SqlValue::as_timestamp)
            .ok_or_else(|| DbError::Execution("SELECT NOW() returned a non-timestamp value".into()))
    }

    fn handle_is_closed(&self) -> bool {
        match &self.handle {
            #[cfg(feature = "postgres")]
            Some(Handle::Postgres(client)) => client.is_closed(),
            _ => false,
        }
    }

    /// Make sure a usable handle exists: dial if there is none, recycle it
    /// when it sat idle past the configured cutoff or the driver reports it
    /// dead.
    async fn ensure_connected(&mut self) -> Result<(), DbError> {
        let idle_expired =
            self.handle.is_some() && self.last_use.elapsed() > self.config.max_idle;
        if idle_expired {
            debug!(
                schema = %self.config.schema,
                idle_secs = self.last_use.elapsed().as_secs(),
                "recycling connection idle past cutoff"
            );
        }
        if self.handle.is_none() || self.handle_is_closed() || idle_expired {
            self.reconnect().await?;
        }
        self.last_use = Instant::now();
        Ok(())
    }

    fn live_handle(&mut self) -> Result<&mut Handle, DbError> {
        self.handle
            .as_mut()
            .ok_or_else(|| DbError::Execution("connection handle missing after redial".into()))
    }

    /// On connectivity failures the handle is dropped so the next statement
    /// starts from a fresh dial; statement failures keep the session.
    fn note_failure(&mut self, err: DbError) -> DbError {
        if err.is_connectivity() {
            error!(
                schema = %self.config.schema,
                error = %err,
                "dropping connection after connectivity failure"
            );
            self.handle = None;
        } else {
            warn!(schema = %self.config.schema, error = %err, "statement failed");
        }
        err
    }
}

#[async_trait]
impl DatabaseExecutor for DbConnection {
    fn backend_kind(&self) -> BackendKind {
        self.config.kind
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        self.ensure_connected().await?;
        let sql = translate_placeholders(sql, self.config.kind.placeholder_style());
        let result = match self.live_handle()? {
            #[cfg(feature = "postgres")]
            Handle::Postgres(client) => postgres::query(client, &sql, params).await,
            #[cfg(feature = "mysql")]
            Handle::Mysql(conn) => mysql::query(conn, &sql, params).await,
        };
        result.map_err(|err| self.note_failure(err))
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        self.ensure_connected().await?;
        let sql = translate_placeholders(sql, self.config.kind.placeholder_style());
        let result = match self.live_handle()? {
            #[cfg(feature = "postgres")]
            Handle::Postgres(client) => postgres::execute(client, &sql, params).await,
            #[cfg(feature = "mysql")]
            Handle::Mysql(conn) => mysql::execute(conn, &sql, params).await,
        };
        result.map_err(|err| self.note_failure(err))
    }

    async fn execute_insert(&mut self, sql: &str, params: &[SqlValue]) -> Result<i64, DbError> {
        self.ensure_connected().await?;
        let sql = translate_placeholders(sql, self.config.kind.placeholder_style());
        let result = match self.live_handle()? {
            #[cfg(feature = "postgres")]
            Handle::Postgres(client) => postgres::execute_insert(client, &sql, params).await,
            #[cfg(feature = "mysql")]
            Handle::Mysql(conn) => mysql::execute_insert(conn, &sql, params).await,
        };
        result.map_err(|err| self.note_failure(err))
    }

    async fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<SqlValue>],
    ) -> Result<u64, DbError> {
        self.ensure_connected().await?;
        let sql = translate_placeholders(sql, self.config.kind.placeholder_style());
        let result = match self.live_handle()? {
            #[cfg(feature = "postgres")]
            Handle::Postgres(client) => postgres::execute_many(client, &sql, param_sets).await,
            #[cfg(feature = "mysql")]
            Handle::Mysql(conn) => mysql::execute_many(conn, &sql, param_sets).await,
        };
        result.map_err(|err| self.note_failure(err))
    }

    async fn execute_batch(&mut self, script: &str) -> Result<(), DbError> {
        self.ensure_connected().await?;
        let result = match self.live_handle()? {
            #[cfg(feature = "postgres")]
            Handle::Postgres(client) => postgres::execute_batch(client, script).await,
            #[cfg(feature = "mysql")]
            Handle::Mysql(conn) => mysql::execute_batch(conn, script).await,
        };
        result.map_err(|err| self.note_failure(err))
    }
}
