//! Action table and typed action values.
//!
//! Every device-control action carries exactly one value field. The table
//! maps an action name to that field's name and JSON type.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

// ============================================================================
// ValueType
// ============================================================================

/// JSON type of an action's value field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// JSON string.
    Text,
    /// JSON integer.
    Integer,
    /// JSON number, integers accepted.
    Real,
    /// JSON `true` / `false`.
    Boolean,
    /// JSON object.
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "boolean",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ActionValue
// ============================================================================

/// A value read from, or written to, an action's value field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionValue {
    /// String value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Real(f64),
    /// Boolean value.
    Boolean(bool),
    /// Nested object.
    Object(Map<String, Value>),
}

impl ActionValue {
    /// Creates a text value.
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Type tag of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::Text,
            Self::Integer(_) => ValueType::Integer,
            Self::Real(_) => ValueType::Real,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Object(_) => ValueType::Object,
        }
    }

    /// Returns the string if this is a text value.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer value.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number as `f64` for integer and real values.
    #[inline]
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Real(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag if this is a boolean value.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(n) => write!(f, "{n:.2}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Object(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

impl From<&str> for ActionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ActionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ActionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ActionValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for ActionValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// ============================================================================
// Action Table
// ============================================================================

/// One row of the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Action name, e.g. `setPowerState`.
    pub action: &'static str,
    /// Name of the single value field.
    pub value_name: &'static str,
    /// JSON type of the value field.
    pub value_type: ValueType,
}

impl ActionDescriptor {
    const fn new(action: &'static str, value_name: &'static str, value_type: ValueType) -> Self {
        Self {
            action,
            value_name,
            value_type,
        }
    }
}

/// Supported actions.
pub const ACTIONS: [ActionDescriptor; 10] = [
    ActionDescriptor::new("setPowerState", "state", ValueType::Text),
    ActionDescriptor::new("setPowerLevel", "powerLevel", ValueType::Integer),
    ActionDescriptor::new("adjustPowerLevel", "powerLevel", ValueType::Integer),
    ActionDescriptor::new("setBrightness", "brightness", ValueType::Integer),
    ActionDescriptor::new("adjustBrightness", "brightnessDelta", ValueType::Integer),
    ActionDescriptor::new("DoorbellPress", "state", ValueType::Integer),
    ActionDescriptor::new("targetTemperature", "temperature", ValueType::Integer),
    ActionDescriptor::new("adjustTargetTemperature", "temperature", ValueType::Integer),
    ActionDescriptor::new("currentTemperature", "temperature", ValueType::Integer),
    ActionDescriptor::new("setMode", "mode", ValueType::Text),
];

/// Looks up `action` by exact, case-sensitive name. First match wins.
#[must_use]
pub fn find_action(action: &str) -> Option<&'static ActionDescriptor> {
    ACTIONS.iter().find(|descriptor| descriptor.action == action)
}

// ============================================================================
// Tests
// ============================================================================
