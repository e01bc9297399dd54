//! Typed argument values and their conversion from command-line literals.

use serde::Serialize;
use std::fmt;

/// The declared type of an argument's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Any string value (default, no validation)
    #[default]
    String,
    /// Unsigned 64-bit integer
    UInt,
    /// Signed 64-bit integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean (strict "true" or "false" only)
    Bool,
}

impl ValueType {
    /// Convert a literal token into a value of this type.
    ///
    /// On failure the returned string describes what was expected; the caller
    /// adds the argument name and the literal.
    pub fn convert(self, literal: &str) -> Result<Value, String> {
        match self {
            ValueType::String => Ok(Value::Str(literal.to_string())),
            ValueType::UInt => literal
                .parse::<u64>()
                .map(Value::UInt)
                .map_err(|e| format!("expected an unsigned integer ({})", e)),
            ValueType::Int => literal
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("expected an integer ({})", e)),
            ValueType::Float => literal
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("expected a number ({})", e)),
            ValueType::Bool => match literal {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err("expected 'true' or 'false'".to_string()),
            },
        }
    }

    /// Placeholder shown in help when no value name was given.
    pub fn placeholder(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::UInt => "uint",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }
}

/// A single parsed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Types that can be read back out of a parsed [`Value`].
///
/// Integer conversions are checked, so asking for a `u32` from a value that
/// does not fit yields `None` rather than a truncated number.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).and_then(|n| u32::try_from(n).ok())
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).and_then(|n| usize::try_from(n).ok())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}
