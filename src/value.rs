//! Values held by dynamically described records.
//!
//! Statically typed records keep their own fields; [`Row`](crate::record::Row)
//! stores one `Value` per declared field instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::FieldType;

/// Possible values a row field can hold.
///
/// # Examples
///
/// ```
/// use idgate::Value;
///
/// let id = Value::Int(7);
/// assert_eq!(id.as_int(), Some(7));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Structured(serde_json::Value),
    Null,
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "i64",
            Self::Float(_) => "f64",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Structured(_) => "structured",
            Self::Null => "null",
        }
    }

    /// Whether this value may be stored in a field of type `ty`.
    ///
    /// `Null` fits every field type.
    #[must_use]
    pub const fn fits(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (Self::Null, _)
                | (Self::Bool(_), FieldType::Bool)
                | (Self::Int(_), FieldType::I64 | FieldType::I32)
                | (Self::Float(_), FieldType::F64)
                | (Self::String(_), FieldType::Text)
                | (Self::Timestamp(_), FieldType::Timestamp)
                | (Self::Structured(_), FieldType::Json)
        )
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Structured(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_fits_field_type() {
        assert!(Value::Int(1).fits(FieldType::I64));
        assert!(Value::Int(1).fits(FieldType::I32));
        assert!(!Value::Int(1).fits(FieldType::Text));
        assert!(Value::Null.fits(FieldType::I64));
        assert!(Value::from("x").fits(FieldType::Text));
        assert!(Value::Timestamp(Utc::now()).fits(FieldType::Timestamp));
        assert!(!Value::Float(1.0).fits(FieldType::I64));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(Some(5_i64)), Value::Int(5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_serde_tagged() {
        let json = serde_json::to_string(&Value::Int(9)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":9}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Int(9));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from("a").to_string(), "\"a\"");
    }
}
