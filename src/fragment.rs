//! Typed access to loosely-typed `project.json` fragments.
//!
//! Every helper takes a `what` label naming the entity being decoded so that
//! errors read like `Invalid block 'abc'.opcode: expected a string, found 3`.

use crate::error::{ProjectError, Result};
use serde_json::{Map, Number, Value};

pub fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ProjectError::validation(what, format!("expected an object, found {}", value)))
}

pub fn array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ProjectError::validation(what, format!("expected an array, found {}", value)))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str, what: &str) -> Result<&'a Value> {
    obj.get(key)
        .ok_or_else(|| ProjectError::validation(format!("{}.{}", what, key), "required key is missing"))
}

fn mistyped(what: &str, key: &str, expected: &str, found: &Value) -> ProjectError {
    ProjectError::validation(
        format!("{}.{}", what, key),
        format!("expected {}, found {}", expected, found),
    )
}

pub fn req_str(obj: &Map<String, Value>, key: &str, what: &str) -> Result<String> {
    let value = field(obj, key, what)?;
    value
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| mistyped(what, key, "a string", value))
}

pub fn req_bool(obj: &Map<String, Value>, key: &str, what: &str) -> Result<bool> {
    let value = field(obj, key, what)?;
    value.as_bool().ok_or_else(|| mistyped(what, key, "a boolean", value))
}

pub fn req_number(obj: &Map<String, Value>, key: &str, what: &str) -> Result<Number> {
    let value = field(obj, key, what)?;
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(mistyped(what, key, "a number", value)),
    }
}

pub fn req_object(obj: &Map<String, Value>, key: &str, what: &str) -> Result<Map<String, Value>> {
    let value = field(obj, key, what)?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| mistyped(what, key, "an object", value))
}

/// A key that may be absent, `null`, or a string.
pub fn opt_str(obj: &Map<String, Value>, key: &str, what: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(mistyped(what, key, "a string or null", other)),
    }
}

pub fn opt_number(obj: &Map<String, Value>, key: &str, what: &str) -> Result<Option<Number>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(other) => Err(mistyped(what, key, "a number or null", other)),
    }
}

pub fn to_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or_default()
}

/// Integral values are stored as JSON integers so `0` does not become `0.0`.
pub fn number(field: &str, v: f64) -> Result<Number> {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        return Ok(Number::from(v as i64));
    }
    Number::from_f64(v).ok_or_else(|| ProjectError::validation(field, format!("{} is not a finite number", v)))
}
