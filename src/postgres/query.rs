use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use tokio_postgres::Statement;

use super::classify;
use crate::error::DbError;
use crate::row::{Columns, Row};
use crate::types::SqlValue;

/// Convert driver rows into generic rows, sharing one column table built
/// from the prepared statement's metadata.
pub(crate) fn rows_from_statement(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<Vec<Row>, DbError> {
    let columns = Arc::new(Columns::new(
        stmt.columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
    ));

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(extract_value(row, idx)?);
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(out)
}

/// Extract one column as a [`SqlValue`], dispatching on the column's
/// declared type name. Unrecognized types fall back to a string read, which
/// surfaces the driver's conversion error if the type has no text form.
pub(crate) fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, DbError> {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Int))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Bool))
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Timestamp))
        }
        // NOW() and friends are timestamptz; store them normalized to UTC.
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Timestamp(v.naive_utc())))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, |v| {
                SqlValue::Timestamp(v.and_time(NaiveTime::MIN))
            }))
        }
        "json" | "jsonb" => {
            let val: Option<JsonValue> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Json))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Blob))
        }
        _ => {
            let val: Option<String> = row.try_get(idx).map_err(classify)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Text))
        }
    }
}
