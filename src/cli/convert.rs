//! JSON <-> Value conversion utilities

use crate::{EvalError, Value};

/// Convert serde_json::Value to Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert a query result to serde_json::Value.
///
/// Lazy values are forced; host objects and functions have no JSON form and
/// are written as `"<kind>"` placeholders.
pub fn value_to_json(v: Value) -> Result<serde_json::Value, EvalError> {
    Ok(match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Array(arr) => serde_json::Value::Array(
            arr.into_iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(obj) => serde_json::Value::Object(
            obj.into_iter()
                .map(|(k, v)| value_to_json(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Lazy(lazy) => value_to_json(lazy.force()?)?,
        other @ (Value::Host(_) | Value::Function(_)) => {
            serde_json::Value::String(format!("<{}>", other.kind()))
        }
    })
}
