use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::connection::DatabaseExecutor;
use crate::error::DbError;
use crate::types::{RowKey, SqlValue};

/// Column names of one result set, shared by every row in it.
///
/// Lookup by name goes through a prebuilt index so repeated access does not
/// re-scan the name list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A single result row: shared column metadata plus this row's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<SqlValue>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<Columns>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Build a standalone row from `(column, value)` pairs. Mostly useful in
    /// tests and when synthesizing rows outside a query result.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, SqlValue)>) -> Self {
        let (names, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self {
            columns: Arc::new(Columns::new(names)),
            values,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    /// Value of `column`, or `None` when the result set has no such column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .position(column)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Like [`Row::get`] but missing columns become a [`DbError::Execution`],
    /// for mapping code that treats absence as malformed data.
    pub fn try_get(&self, column: &str) -> Result<&SqlValue, DbError> {
        self.get(column)
            .ok_or_else(|| DbError::Execution(format!("row has no column named {column}")))
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Mapping from a generic [`Row`] to a typed value.
pub trait FromRow: Sized {
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] when an expected column is missing or
    /// holds a value of the wrong type.
    fn from_row(row: &Row) -> Result<Self, DbError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(row.clone())
    }
}

/// Fetch at most one row from `table` where `id_column` equals `id`.
///
/// `table` and `id_column` are interpolated as identifiers and must come
/// from code, never from user input.
///
/// # Errors
///
/// Propagates query failures; [`DbError::MultipleRows`] when the id matches
/// more than one row.
pub async fn fetch_by_id<E, T>(
    db: &mut E,
    table: &str,
    id_column: &str,
    id: SqlValue,
) -> Result<Option<T>, DbError>
where
    E: DatabaseExecutor + Send,
    T: FromRow + Send,
{
    let sql = format!("SELECT * FROM {table} WHERE {id_column} = ?");
    db.get_as::<T>(&sql, &[id]).await
}

/// Fetch every row from `table` where `column` equals `value`.
///
/// Identifier arguments are trusted; see [`fetch_by_id`].
///
/// # Errors
///
/// Propagates query failures.
pub async fn scan_by_key<E, T>(
    db: &mut E,
    table: &str,
    column: &str,
    value: SqlValue,
) -> Result<Vec<T>, DbError>
where
    E: DatabaseExecutor + Send,
    T: FromRow + Send,
{
    let sql = format!("SELECT * FROM {table} WHERE {column} = ?");
    db.query_as::<T>(&sql, &[value]).await
}

/// Index `rows` by the value of `key`.
///
/// Rows missing the column, or holding a value with no stable key form
/// (floats, JSON), are dropped. When several rows share a key the last one
/// wins, matching the input order.
#[must_use]
pub fn index_rows_by_key(rows: Vec<Row>, key: &str) -> HashMap<RowKey, Row> {
    let mut indexed = HashMap::with_capacity(rows.len());
    for row in rows {
        match row.get(key).and_then(SqlValue::as_key) {
            Some(key_value) => {
                indexed.insert(key_value, row);
            }
            None => {
                debug!(column = key, "dropping row without an indexable key");
            }
        }
    }
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::from_pairs([
            ("id".to_string(), SqlValue::Int(7)),
            ("name".to_string(), SqlValue::Text("alpha".into())),
            ("score".to_string(), SqlValue::Float(2.5)),
        ])
    }

    #[test]
    fn lookup_by_name_and_index_agree() {
        let row = sample_row();
        assert_eq!(row.get("id"), Some(&SqlValue::Int(7)));
        assert_eq!(row.get_by_index(1), row.get("name"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns(), &["id", "name", "score"]);
    }

    #[test]
    fn try_get_reports_missing_columns() {
        let row = sample_row();
        assert!(row.try_get("name").is_ok());
        let err = row.try_get("absent").unwrap_err();
        assert!(matches!(err, DbError::Execution(_)));
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn columns_are_shared_across_rows() {
        let columns = Arc::new(Columns::new(vec!["a".into(), "b".into()]));
        let first = Row::new(Arc::clone(&columns), vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let second = Row::new(Arc::clone(&columns), vec![SqlValue::Int(3), SqlValue::Null]);
        assert_eq!(first.get("b"), Some(&SqlValue::Int(2)));
        assert!(second.get("b").is_some_and(SqlValue::is_null));
    }

    #[test]
    fn indexing_keeps_last_row_per_key_and_drops_unkeyable() {
        let rows = vec![
            Row::from_pairs([
                ("id".to_string(), SqlValue::Int(1)),
                ("name".to_string(), SqlValue::Text("first".into())),
            ]),
            Row::from_pairs([
                ("id".to_string(), SqlValue::Int(1)),
                ("name".to_string(), SqlValue::Text("second".into())),
            ]),
            Row::from_pairs([
                ("id".to_string(), SqlValue::Float(1.5)),
                ("name".to_string(), SqlValue::Text("unkeyable".into())),
            ]),
            Row::from_pairs([("name".to_string(), SqlValue::Text("keyless".into()))]),
        ];
        let indexed = index_rows_by_key(rows, "id");
        assert_eq!(indexed.len(), 1);
        assert_eq!(
            indexed[&RowKey::Int(1)].get("name"),
            Some(&SqlValue::Text("second".into()))
        );
    }

    #[tokio::test]
    async fn fetch_helpers_shape_the_statement() {
        use crate::test_support::FakeDb;

        let mut db = FakeDb::default();
        db.push_rows(vec![sample_row()]);
        let found: Option<Row> = fetch_by_id(&mut db, "widgets", "id", SqlValue::Int(7))
            .await
            .unwrap();
        assert!(found.is_some());

        let _: Vec<Row> = scan_by_key(&mut db, "widgets", "name", SqlValue::Text("alpha".into()))
            .await
            .unwrap();

        assert_eq!(db.calls[0].sql, "SELECT * FROM widgets WHERE id = ?");
        assert_eq!(db.calls[0].params, vec![SqlValue::Int(7)]);
        assert_eq!(db.calls[1].sql, "SELECT * FROM widgets WHERE name = ?");
    }
}
