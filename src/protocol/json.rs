//! Typed field lookup in inbound JSON.
//!
//! Inbound requests nest their fields at varying depths (`payload.value.state`,
//! a bare `timestamp`), so lookups go by field name rather than by path:
//! direct children of the root first, then a depth-first walk through nested
//! objects in document order. A field whose name matches but whose type does
//! not is skipped and the search continues.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use super::{ActionValue, ValueType};

// ============================================================================
// Lookup
// ============================================================================

/// Finds the first field called `name` holding a value of type `ty`.
///
/// Integers satisfy a [`ValueType::Real`] request and are returned as
/// [`ActionValue::Real`].
#[must_use]
pub fn find_field(root: &Value, name: &str, ty: ValueType) -> Option<ActionValue> {
    let object = root.as_object()?;

    object
        .get(name)
        .and_then(|value| convert(value, ty))
        .or_else(|| search_nested(object, name, ty))
}

/// Finds the first string field called `name`.
#[must_use]
pub fn find_str(root: &Value, name: &str) -> Option<String> {
    match find_field(root, name, ValueType::Text)? {
        ActionValue::Text(s) => Some(s),
        _ => None,
    }
}

/// Finds the first integer field called `name`.
#[must_use]
pub fn find_i64(root: &Value, name: &str) -> Option<i64> {
    find_field(root, name, ValueType::Integer)?.as_i64()
}

fn search_nested(object: &Map<String, Value>, name: &str, ty: ValueType) -> Option<ActionValue> {
    object.iter().find_map(|(key, value)| {
        let child = value.as_object()?;
        if key == name
            && let Some(found) = convert(value, ty)
        {
            return Some(found);
        }
        child
            .get(name)
            .and_then(|value| convert(value, ty))
            .or_else(|| search_nested(child, name, ty))
    })
}

fn convert(value: &Value, ty: ValueType) -> Option<ActionValue> {
    match (ty, value) {
        (ValueType::Text, Value::String(s)) => Some(ActionValue::Text(s.clone())),
        (ValueType::Integer, Value::Number(n)) => n.as_i64().map(ActionValue::Integer),
        (ValueType::Real, Value::Number(n)) => n.as_f64().map(ActionValue::Real),
        (ValueType::Boolean, Value::Bool(b)) => Some(ActionValue::Boolean(*b)),
        (ValueType::Object, Value::Object(map)) => Some(ActionValue::Object(map.clone())),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
