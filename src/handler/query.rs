use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Statement;
use rusqlite::types::Value;
use serde_json::{Map, Value as JsonValue};

use crate::error::SqlRelayError;

use super::params::values_as_tosql;

lazy_static! {
    static ref ROW_RETURNING: Regex =
        Regex::new(r"(?i)\b(select|pragma|with|returning)\b").expect("static pattern");
}

/// Whether a statement yields rows (as opposed to plain DML).
#[must_use]
pub fn returns_rows(sql: &str) -> bool {
    ROW_RETURNING.is_match(sql)
}

/// Count positional `?` markers. Quoted literals are not excluded.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    sql.bytes().filter(|b| *b == b'?').count()
}

fn sqlite_value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(i),
        Value::Real(f) => serde_json::Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number),
        Value::Text(s) => JsonValue::String(s),
        Value::Blob(bytes) => JsonValue::String(BASE64.encode(bytes)),
    }
}

fn row_to_object(
    row: &rusqlite::Row<'_>,
    column_names: &[String],
) -> Result<JsonValue, SqlRelayError> {
    let mut object = Map::with_capacity(column_names.len());
    for (idx, name) in column_names.iter().enumerate() {
        let value: Value = row.get(idx)?;
        object.insert(name.clone(), sqlite_value_to_json(value));
    }
    Ok(JsonValue::Object(object))
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().iter().map(ToString::to_string).collect()
}

/// Run a statement and materialize every row as a JSON object keyed by
/// column name.
///
/// # Errors
/// Returns `SqlRelayError::SqliteError` if query execution or value
/// extraction fails.
pub(crate) fn build_rows(
    stmt: &mut Statement<'_>,
    params: &[Value],
) -> Result<Vec<JsonValue>, SqlRelayError> {
    let names = column_names(stmt);
    let param_refs = values_as_tosql(params);
    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        rows.push(row_to_object(row, &names)?);
    }
    Ok(rows)
}

/// Run a statement and materialize only its first row, or `Null` when it
/// yields none.
///
/// # Errors
/// Returns `SqlRelayError::SqliteError` if query execution or value
/// extraction fails.
pub(crate) fn build_first_row(
    stmt: &mut Statement<'_>,
    params: &[Value],
) -> Result<JsonValue, SqlRelayError> {
    let names = column_names(stmt);
    let param_refs = values_as_tosql(params);
    let mut rows_iter = stmt.query(&param_refs[..])?;
    match rows_iter.next()? {
        Some(row) => row_to_object(row, &names),
        None => Ok(JsonValue::Null),
    }
}
