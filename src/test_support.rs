//! In-memory [`DatabaseExecutor`] double for unit tests: records every
//! statement and plays back scripted results.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::connection::DatabaseExecutor;
use crate::error::DbError;
use crate::row::Row;
use crate::types::{BackendKind, SqlValue};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeCall {
    pub op: &'static str,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub(crate) struct FakeDb {
    pub kind: BackendKind,
    pub calls: Vec<FakeCall>,
    query_results: VecDeque<Vec<Row>>,
    insert_ids: VecDeque<i64>,
    affected: VecDeque<u64>,
}

impl FakeDb {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            calls: Vec::new(),
            query_results: VecDeque::new(),
            insert_ids: VecDeque::new(),
            affected: VecDeque::new(),
        }
    }

    /// Queue the rows the next `query` call returns.
    pub fn push_rows(&mut self, rows: Vec<Row>) {
        self.query_results.push_back(rows);
    }

    /// Queue the id the next `execute_insert` call returns.
    pub fn push_insert_id(&mut self, id: i64) {
        self.insert_ids.push_back(id);
    }

    /// Queue the row count the next `execute` call returns.
    pub fn push_affected(&mut self, affected: u64) {
        self.affected.push_back(affected);
    }

    fn record(&mut self, op: &'static str, sql: &str, params: &[SqlValue]) {
        self.calls.push(FakeCall {
            op,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

impl Default for FakeDb {
    fn default() -> Self {
        #[cfg(feature = "postgres")]
        let kind = BackendKind::Postgres;
        #[cfg(all(feature = "mysql", not(feature = "postgres")))]
        let kind = BackendKind::Mysql;
        Self::new(kind)
    }
}

#[async_trait]
impl DatabaseExecutor for FakeDb {
    fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        self.record("query", sql, params);
        Ok(self.query_results.pop_front().unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        self.record("execute", sql, params);
        Ok(self.affected.pop_front().unwrap_or(0))
    }

    async fn execute_insert(&mut self, sql: &str, params: &[SqlValue]) -> Result<i64, DbError> {
        self.record("execute_insert", sql, params);
        Ok(self.insert_ids.pop_front().unwrap_or(1))
    }

    async fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<SqlValue>],
    ) -> Result<u64, DbError> {
        for set in param_sets {
            self.record("execute_many", sql, set);
        }
        Ok(param_sets.len() as u64)
    }

    async fn execute_batch(&mut self, script: &str) -> Result<(), DbError> {
        self.record("execute_batch", script, &[]);
        Ok(())
    }
}
