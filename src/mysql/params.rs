use chrono::{Datelike, Timelike};
use mysql_async::{Params, Value};

use crate::types::SqlValue;

/// Convert a parameter slice into driver params. Statements without
/// placeholders must get `Params::Empty`, not an empty positional list.
pub(crate) fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_value).collect())
    }
}

fn to_value(param: &SqlValue) -> Value {
    match param {
        SqlValue::Int(i) => Value::Int(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Bytes(s.clone().into_bytes()),
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::Timestamp(dt) => Value::Date(
            dt.year().unsigned_abs() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        SqlValue::Null => Value::NULL,
        SqlValue::Json(value) => Value::Bytes(value.to_string().into_bytes()),
        SqlValue::Blob(bytes) => Value::Bytes(bytes.clone()),
    }
}
