use rusqlite::ToSql;
use rusqlite::types::Value;
use serde_json::Value as JsonValue;

use crate::error::SqlRelayError;

/// Convert a single JSON parameter to a `SQLite` value.
///
/// # Errors
/// Returns `SqlRelayError::ParameterError` for numbers representable in JSON
/// but not as `SQLite` integers or reals.
pub fn json_to_sqlite_value(value: &JsonValue) -> Result<Value, SqlRelayError> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                Err(SqlRelayError::ParameterError(format!(
                    "unrepresentable number: {n}"
                )))
            }
        }
        JsonValue::String(s) => Ok(Value::Text(s.clone())),
        // Structured values travel as their JSON text.
        JsonValue::Array(_) | JsonValue::Object(_) => Ok(Value::Text(value.to_string())),
    }
}

/// Convert positional JSON parameters into `SQLite` values.
///
/// # Errors
/// Returns `SqlRelayError::ParameterError` if any element fails conversion.
pub fn convert_params(params: &[JsonValue]) -> Result<Vec<Value>, SqlRelayError> {
    let mut values = Vec::with_capacity(params.len());
    for param in params {
        values.push(json_to_sqlite_value(param)?);
    }
    Ok(values)
}

pub(crate) fn values_as_tosql(values: &[Value]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}
