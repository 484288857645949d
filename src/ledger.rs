//! Schema-migration ledger: one row per migration script, recording when it
//! was seen and when it was applied.
//!
//! Migration names follow the `diffNNN_description.sql` convention; the
//! unapplied scan orders by the digits at positions 5-7 so scripts run in
//! numeric order regardless of name length.

use chrono::NaiveDateTime;

use crate::changeset::{Changeset, build_insert, build_update};
use crate::connection::DatabaseExecutor;
use crate::error::DbError;
use crate::row::{FromRow, Row};
use crate::types::SqlValue;

/// One ledger entry. `applied_dttm` stays NULL until the migration is
/// marked applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlDiff {
    pub sql_diff_id: i64,
    pub sql_diff_name: String,
    pub create_dttm: NaiveDateTime,
    pub applied_dttm: Option<NaiveDateTime>,
}

impl FromRow for SqlDiff {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            sql_diff_id: row
                .try_get("sql_diff_id")?
                .as_int()
                .ok_or_else(|| DbError::Execution("sql_diff_id is not an integer".into()))?,
            sql_diff_name: row
                .try_get("sql_diff_name")?
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| DbError::Execution("sql_diff_name is not text".into()))?,
            create_dttm: row
                .try_get("create_dttm")?
                .as_timestamp()
                .ok_or_else(|| DbError::Execution("create_dttm is not a timestamp".into()))?,
            applied_dttm: row.try_get("applied_dttm")?.as_timestamp(),
        })
    }
}

impl SqlDiff {
    pub const TABLE_NAME: &'static str = "sql_diff";
    pub const ID_COLUMN: &'static str = "sql_diff_id";

    /// Bootstrap DDL, kept byte-identical across deployments so external
    /// tooling can match it.
    pub const CREATE_TABLE_DDL: &'static str = "CREATE TABLE IF NOT EXISTS sql_diff (
  sql_diff_id SERIAL NOT NULL,
  sql_diff_name VARCHAR(80) NOT NULL,
  create_dttm TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
  applied_dttm TIMESTAMP DEFAULT NULL,
  PRIMARY KEY (sql_diff_name)
)";

    /// Create the ledger table if it does not exist yet. Safe to run on
    /// every startup.
    ///
    /// # Errors
    ///
    /// Propagates statement failures.
    pub async fn create_table<E>(db: &mut E) -> Result<u64, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        db.execute(Self::CREATE_TABLE_DDL, &[]).await
    }

    /// Record `name` in the ledger. Returns the new entry's id, or `None`
    /// when the name is already recorded (recording is idempotent; the
    /// existing entry wins).
    ///
    /// # Errors
    ///
    /// Propagates query and insert failures.
    pub async fn record<E>(db: &mut E, name: &str) -> Result<Option<i64>, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        if Self::get_by_name(db, name).await?.is_some() {
            return Ok(None);
        }
        let mut changeset = Changeset::new();
        changeset.set("sql_diff_name", SqlValue::Text(name.to_string()));
        let stmt = build_insert(
            Self::TABLE_NAME,
            Self::ID_COLUMN,
            &changeset,
            db.backend_kind(),
        );
        db.execute_insert(&stmt.sql, &stmt.values).await.map(Some)
    }

    /// Look up a single entry by name.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn get_by_name<E>(db: &mut E, name: &str) -> Result<Option<Self>, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        db.get_as::<Self>(
            "SELECT * FROM sql_diff WHERE sql_diff_name = ?",
            &[SqlValue::Text(name.to_string())],
        )
        .await
    }

    /// Stamp `name` as applied using the server's clock. Returns the number
    /// of rows updated: 0 means the name was never recorded.
    ///
    /// # Errors
    ///
    /// Propagates statement failures.
    pub async fn mark_applied<E>(db: &mut E, name: &str) -> Result<u64, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        let mut changeset = Changeset::new();
        changeset.set_literal("applied_dttm", "NOW()");
        let mut filter = Changeset::new();
        filter.set("sql_diff_name", SqlValue::Text(name.to_string()));
        match build_update(Self::TABLE_NAME, &changeset, &filter)? {
            Some(stmt) => db.execute(&stmt.sql, &stmt.values).await,
            None => Ok(0),
        }
    }

    /// Every ledger entry, applied or not.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn scan<E>(db: &mut E) -> Result<Vec<Self>, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        db.query_as::<Self>("SELECT * FROM sql_diff", &[]).await
    }

    /// Entries not yet applied, ordered by the numeric token in the name.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn scan_unapplied<E>(db: &mut E) -> Result<Vec<Self>, DbError>
    where
        E: DatabaseExecutor + Send,
    {
        db.query_as::<Self>(
            "SELECT * FROM sql_diff WHERE applied_dttm IS NULL ORDER BY SUBSTRING(sql_diff_name from 5 for 3) ASC",
            &[],
        )
        .await
    }
}
