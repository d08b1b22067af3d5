//! Attribute and bind-parameter values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value held by an attribute or bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Interpret the value part of an attribute string.
    ///
    /// - `'…'` / `"…"`: text with the quotes removed
    /// - `NULL` (any case): null
    /// - integer / float literals: numeric
    /// - anything else: text, as written
    pub fn from_literal(s: &str) -> Self {
        let s = s.trim();
        if s.len() >= 2 {
            let bytes = s.as_bytes();
            let (first, last) = (bytes[0], bytes[s.len() - 1]);
            if first == last && (first == b'\'' || first == b'"') {
                return Value::Text(s[1..s.len() - 1].to_string());
            }
        }
        if s.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Ok(v) = s.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = s.parse::<f64>()
            && v.is_finite()
        {
            return Value::Float(v);
        }
        Value::Text(s.to_string())
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The bind type inferred for this value.
    pub fn param_type(&self) -> ParamType {
        match self {
            Value::Null => ParamType::Null,
            Value::Int(_) | Value::Float(_) => ParamType::Int,
            Value::Text(_) => ParamType::Str,
        }
    }

    /// Borrow the text if this is [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer if this is [`Value::Int`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The number if this is [`Value::Int`] or [`Value::Float`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering without quotes (`NULL` for null).
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, bool);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// How a bind parameter is sent to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Null,
    /// Numeric (integers and floats)
    Int,
    Str,
}

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub value: Value,
    pub ty: ParamType,
}

impl Bind {
    /// Bind `value` with its inferred type.
    pub fn new(value: Value) -> Self {
        let ty = value.param_type();
        Self { value, ty }
    }

    /// Bind `value` with an explicit type.
    pub fn typed(value: Value, ty: ParamType) -> Self {
        Self { value, ty }
    }

    /// The value converted to its bind type, as handed to the driver.
    ///
    /// `Str` stringifies numbers, `Int` parses numeric text and leaves other
    /// text untouched, `Null` always sends NULL.
    pub fn coerced(&self) -> Value {
        match (self.ty, &self.value) {
            (ParamType::Null, _) | (_, Value::Null) => Value::Null,
            (ParamType::Str, Value::Text(_)) => self.value.clone(),
            (ParamType::Str, v) => Value::Text(v.to_text()),
            (ParamType::Int, Value::Text(s)) => match Value::from_literal(s) {
                v @ (Value::Int(_) | Value::Float(_)) => v,
                _ => self.value.clone(),
            },
            (ParamType::Int, v) => v.clone(),
        }
    }

    /// SQL literal used in debug renderings.
    pub fn debug_literal(&self) -> String {
        match self.coerced() {
            Value::Null => "NULL".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) if self.ty == ParamType::Str => format!("'{}'", s.replace('\'', "''")),
            Value::Text(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_inference() {
        assert_eq!(Value::from_literal("21"), Value::Int(21));
        assert_eq!(Value::from_literal("-3"), Value::Int(-3));
        assert_eq!(Value::from_literal("2.5"), Value::Float(2.5));
        assert_eq!(Value::from_literal("\"bob\""), Value::Text("bob".into()));
        assert_eq!(Value::from_literal("'21'"), Value::Text("21".into()));
        assert_eq!(Value::from_literal("null"), Value::Null);
        assert_eq!(Value::from_literal("bob smith"), Value::Text("bob smith".into()));
        assert_eq!(Value::from_literal("inf"), Value::Text("inf".into()));
    }

    #[test]
    fn inferred_param_types() {
        assert_eq!(Bind::new(Value::Null).ty, ParamType::Null);
        assert_eq!(Bind::new(5.into()).ty, ParamType::Int);
        assert_eq!(Bind::new(1.5.into()).ty, ParamType::Int);
        assert_eq!(Bind::new("x".into()).ty, ParamType::Str);
    }

    #[test]
    fn explicit_type_coerces() {
        let b = Bind::typed(Value::Int(5), ParamType::Str);
        assert_eq!(b.coerced(), Value::Text("5".into()));
        assert_eq!(b.debug_literal(), "'5'");

        let b = Bind::typed(Value::Text("42".into()), ParamType::Int);
        assert_eq!(b.coerced(), Value::Int(42));
        assert_eq!(b.debug_literal(), "42");

        let b = Bind::typed(Value::Text("x".into()), ParamType::Null);
        assert_eq!(b.coerced(), Value::Null);
    }

    #[test]
    fn debug_literal_quotes_text() {
        assert_eq!(Bind::new("o'hara".into()).debug_literal(), "'o''hara'");
        assert_eq!(Bind::new(Value::Null).debug_literal(), "NULL");
        assert_eq!(Bind::new(7.into()).debug_literal(), "7");
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}
