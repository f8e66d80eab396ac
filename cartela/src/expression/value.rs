use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Attribute value of a feature, and the result of an expression evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// Text.
    String(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value type, as used in datasource schemas.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
        }
    }

    /// Truthiness of the value: `null`, `false`, zero and the empty string are false.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Double(v) => *v != 0.0,
            Value::String(v) => !v.is_empty(),
        }
    }

    /// Numeric value. Strings are parsed; `null` and unparsable strings give `None`.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::String(v) => v.trim().parse().ok(),
        }
    }

    /// Integer value. Doubles are accepted only if they have no fractional part.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(*v as i64),
            Value::Int(v) => Some(*v),
            Value::Double(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Value::Double(_) => None,
            Value::String(v) => v.trim().parse().ok(),
        }
    }

    /// Converts the value into a number, keeping integers as integers.
    pub(crate) fn to_number(&self) -> Option<Number> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(Number::Int(*v as i64)),
            Value::Int(v) => Some(Number::Int(*v)),
            Value::Double(v) => Some(Number::Double(*v)),
            Value::String(v) => {
                let v = v.trim();
                v.parse::<i64>()
                    .map(Number::Int)
                    .ok()
                    .or_else(|| v.parse::<f64>().map(Number::Double).ok())
            }
        }
    }

    /// Text representation of the value as used for labels and string concatenation. `null`
    /// is the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(v) => v.clone(),
            other => other.to_string(),
        }
    }

    /// Compares two values of comparable types. Returns `None` when either value is `null` or
    /// a string cannot be read as the number it is compared with.
    pub(crate) fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.to_number()?, b.to_number()?) {
                (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
                (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
            },
        }
    }
}

/// Numeric view of a [`Value`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Double(v) => v,
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        match value {
            Number::Int(v) => Value::Int(v),
            Number::Double(v) => Value::Double(v),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Value::from("12").to_f64(), Some(12.0));
        assert_eq!(Value::from("abc").to_f64(), None);
        assert_eq!(Value::Double(3.0).to_i64(), Some(3));
        assert_eq!(Value::Double(3.5).to_i64(), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Double(1.5).to_text(), "1.5");
    }

    #[test]
    fn comparison() {
        assert_eq!(Value::Int(1).compare(&Value::Double(1.0)), Some(Ordering::Equal));
        assert_eq!(Value::from("10").compare(&Value::Int(9)), Some(Ordering::Greater));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from("x").compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 1, 1.5, "a"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(1),
                Value::Double(1.5),
                Value::from("a")
            ]
        );
    }
}
