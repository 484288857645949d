use tracing::debug;

use crate::error::DbError;
use crate::types::{BackendKind, SqlValue};

/// A column's value inside a [`Changeset`]: either bound as a parameter or
/// spliced into the SQL text verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Sent through the driver's parameter binding. Always safe for data
    /// that originated outside the program.
    Bound(SqlValue),
    /// Raw SQL fragment placed directly into the statement, for
    /// server-evaluated expressions like `NOW()` or `counter + 1`.
    /// Never build one of these from user input.
    Literal(String),
}

/// An ordered set of `(column, value)` assignments used to generate INSERT
/// and UPDATE statements.
///
/// Columns keep the order they were added in, so the generated SQL is
/// deterministic and the value list lines up with the placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    fields: Vec<(String, FieldValue)>,
}

/// A changeset decomposed for SQL generation: column names, the per-column
/// SQL fragments (`?` or the literal text), and the bound values in
/// placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitChangeset {
    pub columns: Vec<String>,
    pub fragments: Vec<String>,
    pub values: Vec<SqlValue>,
}

/// A generated statement plus the values to bind to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl Changeset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `column` a bound parameter value.
    pub fn set(&mut self, column: impl Into<String>, value: SqlValue) -> &mut Self {
        self.fields.push((column.into(), FieldValue::Bound(value)));
        self
    }

    /// Assign `column` a raw SQL expression. The fragment is trusted; see
    /// [`FieldValue::Literal`].
    pub fn set_literal(&mut self, column: impl Into<String>, fragment: impl Into<String>) -> &mut Self {
        self.fields
            .push((column.into(), FieldValue::Literal(fragment.into())));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(column, _)| column.as_str())
    }

    /// Decompose into columns, SQL fragments, and bound values. Literal
    /// fields contribute their text as the fragment and no bound value;
    /// bound fields contribute a `?` placeholder.
    #[must_use]
    pub fn split(&self) -> SplitChangeset {
        let mut columns = Vec::with_capacity(self.fields.len());
        let mut fragments = Vec::with_capacity(self.fields.len());
        let mut values = Vec::new();
        for (column, field) in &self.fields {
            columns.push(column.clone());
            match field {
                FieldValue::Bound(value) => {
                    fragments.push("?".to_string());
                    values.push(value.clone());
                }
                FieldValue::Literal(fragment) => fragments.push(fragment.clone()),
            }
        }
        SplitChangeset {
            columns,
            fragments,
            values,
        }
    }
}

/// Generate an INSERT statement for `changeset`.
///
/// On backends that support it, a `RETURNING {id_column}` clause is appended
/// so [`execute_insert`](crate::connection::DatabaseExecutor::execute_insert)
/// can read the generated id from the result row; other backends take the id
/// from the session counter instead. Placeholders are emitted in the portable
/// `?` form and translated at execution time.
///
/// `table` and `id_column` are trusted identifiers.
#[must_use]
pub fn build_insert(
    table: &str,
    id_column: &str,
    changeset: &Changeset,
    kind: BackendKind,
) -> BuiltStatement {
    let parts = changeset.split();
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        parts.columns.join(", "),
        parts.fragments.join(", ")
    );
    if kind.supports_insert_returning() {
        sql.push_str(" RETURNING ");
        sql.push_str(id_column);
    }
    BuiltStatement {
        sql,
        values: parts.values,
    }
}

/// Generate an UPDATE statement applying `changeset` to the rows matched by
/// `filter` (assignments ANDed together).
///
/// Returns `Ok(None)` when `changeset` is empty: there is nothing to write
/// and callers can skip the round trip.
///
/// # Errors
///
/// An empty `filter` is refused with [`DbError::Execution`] rather than
/// generating an UPDATE that touches every row in the table.
pub fn build_update(
    table: &str,
    changeset: &Changeset,
    filter: &Changeset,
) -> Result<Option<BuiltStatement>, DbError> {
    if changeset.is_empty() {
        debug!(table, "empty changeset, skipping update");
        return Ok(None);
    }
    if filter.is_empty() {
        return Err(DbError::Execution(format!(
            "refusing to update {table} without a where clause"
        )));
    }

    let assignments = changeset.split();
    let conditions = filter.split();

    let set_clause = assignments
        .columns
        .iter()
        .zip(&assignments.fragments)
        .map(|(column, fragment)| format!("{column}={fragment}"))
        .collect::<Vec<_>>()
        .join(", ");
    let where_clause = conditions
        .columns
        .iter()
        .zip(&conditions.fragments)
        .map(|(column, fragment)| format!("{column}={fragment}"))
        .collect::<Vec<_>>()
        .join(" AND ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {where_clause}");
    let mut values = assignments.values;
    values.extend(conditions.values);
    Ok(Some(BuiltStatement { sql, values }))
}
