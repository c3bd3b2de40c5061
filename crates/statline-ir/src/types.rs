//! Cell values for statline tables

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A single table cell.
///
/// Source tables come from independently maintained feeds, so a column that is
/// "numeric" in one snapshot can arrive as text in the next. Every numeric read
/// goes through [`Value::as_f64`] and friends, which coerce instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Build a float cell; NaN and infinities become `Null`.
    pub fn float(value: f64) -> Self {
        if value.is_finite() {
            Value::Float(value)
        } else {
            Value::Null
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell.
    ///
    /// Strings are parsed after trimming whitespace and a trailing `%`, so
    /// formatted percentage labels still order numerically.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            Value::Float(_) => None,
            Value::String(s) => {
                let trimmed = s.trim();
                let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
    }

    /// Integral view of the cell; fractional numbers yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            other => other
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64),
        }
    }

    /// Textual view of the cell, used for team and name matching.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Int(i) => Some(Cow::Owned(i.to_string())),
            Value::Float(f) => Some(Cow::Owned(f.to_string())),
        }
    }

    /// Coerce to a numeric cell. Unparseable text becomes `Null`.
    pub fn to_numeric(&self) -> Value {
        match self {
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::float(*f),
            Value::Null => Value::Null,
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Int(i)
                } else {
                    trimmed.parse::<f64>().map(Value::float).unwrap_or(Value::Null)
                }
            }
        }
    }

    /// Grouping/join key for this cell.
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Int(i) => ValueKey::number(*i as f64),
            Value::Float(f) if f.is_finite() => ValueKey::number(*f),
            Value::Float(_) => ValueKey::Null,
            Value::String(s) => ValueKey::Text(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
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

/// Hashable, totally ordered projection of a [`Value`].
///
/// `Int(3)` and `Float(3.0)` share a key. Ordering is numbers, then text,
/// then nulls.
#[derive(Debug, Clone)]
pub enum ValueKey {
    Number(f64),
    Text(String),
    Null,
}

impl ValueKey {
    fn number(value: f64) -> Self {
        // -0.0 and 0.0 must hash alike
        ValueKey::Number(if value == 0.0 { 0.0 } else { value })
    }

    fn rank(&self) -> u8 {
        match self {
            ValueKey::Number(_) => 0,
            ValueKey::Text(_) => 1,
            ValueKey::Null => 2,
        }
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            ValueKey::Number(f) => f.to_bits().hash(state),
            ValueKey::Text(s) => s.hash(state),
            ValueKey::Null => {}
        }
    }
}

impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ValueKey::Number(a), ValueKey::Number(b)) => a.total_cmp(b),
            (ValueKey::Text(a), ValueKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::text("12.5").as_f64(), Some(12.5));
        assert_eq!(Value::text(" 85.0% ").as_f64(), Some(85.0));
        assert_eq!(Value::text("n/a").as_f64(), None);
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::text("2024").to_numeric(), Value::Int(2024));
        assert_eq!(Value::text("bye").to_numeric(), Value::Null);
    }

    #[test]
    fn test_integral_view() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::text("7").as_i64(), Some(7));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(Value::float(f64::INFINITY), Value::Null);
        assert_eq!(Value::from(2.5), Value::Float(2.5));
    }

    #[test]
    fn test_key_unifies_int_and_float() {
        assert_eq!(Value::Int(3).key(), Value::Float(3.0).key());
        assert!(Value::Int(1).key() < Value::text("a").key());
        assert!(Value::text("z").key() < Value::Null.key());
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let row = vec![Value::Null, Value::Int(4), Value::Float(1.5), Value::text("KC")];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[null,4,1.5,"KC"]"#);
    }
}
