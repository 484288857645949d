use std::sync::Arc;

use chrono::NaiveDate;
use mysql_async::consts::ColumnType;
use mysql_async::{Column, Value};

use crate::error::DbError;
use crate::row::{Columns, Row};
use crate::types::SqlValue;

const BINARY_CHARSET: u16 = 63;

/// Convert driver rows into generic rows. Column metadata is taken from the
/// first row; an empty result set needs none.
pub(crate) fn rows_from_driver(rows: Vec<mysql_async::Row>) -> Result<Vec<Row>, DbError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let driver_columns: Vec<Column> = first.columns_ref().to_vec();
    let columns = Arc::new(Columns::new(
        driver_columns
            .iter()
            .map(|col| col.name_str().into_owned())
            .collect(),
    ));

    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        let mut values = Vec::with_capacity(driver_columns.len());
        for (idx, column) in driver_columns.iter().enumerate() {
            let value = row.take::<Value, _>(idx).unwrap_or(Value::NULL);
            values.push(extract_value(value, column)?);
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(out)
}

/// Map one binary-protocol value onto a [`SqlValue`], using the column
/// metadata to tell text from binary payloads and to spot JSON columns.
fn extract_value(value: Value, column: &Column) -> Result<SqlValue, DbError> {
    match value {
        Value::NULL => Ok(SqlValue::Null),
        Value::Int(i) => Ok(SqlValue::Int(i)),
        Value::UInt(u) => i64::try_from(u).map(SqlValue::Int).map_err(|_| {
            DbError::Execution(format!(
                "unsigned value {u} in column {} exceeds the i64 range",
                column.name_str()
            ))
        }),
        Value::Float(f) => Ok(SqlValue::Float(f64::from(f))),
        Value::Double(d) => Ok(SqlValue::Float(d)),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let timestamp = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micros,
                    )
                })
                .ok_or_else(|| {
                    DbError::Execution(format!(
                        "column {} holds an out-of-range datetime",
                        column.name_str()
                    ))
                })?;
            Ok(SqlValue::Timestamp(timestamp))
        }
        // TIME values have no calendar date; render them as text.
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u64::from(days) * 24 + u64::from(hours);
            let text = if micros == 0 {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}")
            } else {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
            };
            Ok(SqlValue::Text(text))
        }
        Value::Bytes(bytes) => extract_bytes(bytes, column),
    }
}

fn extract_bytes(bytes: Vec<u8>, column: &Column) -> Result<SqlValue, DbError> {
    if column.column_type() == ColumnType::MYSQL_TYPE_JSON {
        return match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(SqlValue::Json(value)),
            Err(err) => Err(DbError::Execution(format!(
                "column {} holds malformed JSON: {err}",
                column.name_str()
            ))),
        };
    }

    // BLOB and TEXT share column types; the character set tells them apart.
    if column.character_set() == BINARY_CHARSET {
        return Ok(SqlValue::Blob(bytes));
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(SqlValue::Text(text)),
        Err(err) => Ok(SqlValue::Blob(err.into_bytes())),
    }
}
