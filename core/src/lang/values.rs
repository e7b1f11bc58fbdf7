//! Runtime value type and its JSON bridge

use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;

use crate::error::RuntimeFault;

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Val>),
    Obj(HashMap<String, Val>),
}

impl Val {
    /// Name of the value's kind, used in fault messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// Numeric view of the value (ints widen to floats)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Val::Int(i) => Some(*i as f64),
            Val::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert a JSON value into a runtime value
    ///
    /// Integers that fit in `i64` stay integers; everything else numeric becomes a float.
    pub fn from_json(value: JsonValue) -> Val {
        match value {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Val::Int(i),
                None => Val::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Val::Str(s),
            JsonValue::Array(items) => Val::List(items.into_iter().map(Val::from_json).collect()),
            JsonValue::Object(fields) => Val::Obj(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Val::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a runtime value back into JSON
    ///
    /// Fails for non-finite floats, which JSON cannot represent.
    pub fn into_json(self) -> Result<JsonValue, RuntimeFault> {
        let json = match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(b),
            Val::Int(i) => JsonValue::Number(i.into()),
            Val::Float(f) => JsonValue::Number(Number::from_f64(f).ok_or_else(|| {
                RuntimeFault::Evaluation(format!("result {} is not a finite number", f))
            })?),
            Val::Str(s) => JsonValue::String(s),
            Val::List(items) => JsonValue::Array(
                items
                    .into_iter()
                    .map(Val::into_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Val::Obj(fields) => {
                let mut map = Map::new();
                for (k, v) in fields {
                    map.insert(k, v.into_json()?);
                }
                JsonValue::Object(map)
            }
        };
        Ok(json)
    }

    /// Structural equality where ints and floats compare numerically
    pub fn loosely_equals(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => (*a as f64) == *b,
            (Val::List(a), Val::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Val::Obj(a), Val::Obj(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loosely_equals(w)))
            }
            _ => self == other,
        }
    }
}

/// Display form used by string concatenation; `null` renders as empty
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => Ok(()),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Int(i) => write!(f, "{}", i),
            Val::Float(x) => write!(f, "{}", x),
            Val::Str(s) => f.write_str(s),
            Val::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Val::Obj(_) => f.write_str("[object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_integers() {
        assert_eq!(Val::from_json(json!(5)), Val::Int(5));
        assert_eq!(Val::from_json(json!(2.5)), Val::Float(2.5));
        assert_eq!(Val::from_json(json!(u64::MAX)), Val::Float(u64::MAX as f64));
    }

    #[test]
    fn test_from_json_object() {
        let val = Val::from_json(json!({"Value": 5, "Name": "a"}));
        assert_eq!(
            val,
            Val::Obj(hashmap! {
                "Value".to_string() => Val::Int(5),
                "Name".to_string() => Val::Str("a".to_string()),
            })
        );
    }

    #[test]
    fn test_into_json_rejects_nan() {
        assert!(Val::Float(f64::NAN).into_json().is_err());
        assert!(Val::List(vec![Val::Float(f64::INFINITY)]).into_json().is_err());
    }

    #[test]
    fn test_into_json_nested() {
        let val = Val::Obj(hashmap! {
            "items".to_string() => Val::List(vec![Val::Int(1), Val::Null]),
        });
        assert_eq!(val.into_json().unwrap(), json!({"items": [1, null]}));
    }

    #[test]
    fn test_loose_equality_across_numeric_kinds() {
        assert!(Val::Int(2).loosely_equals(&Val::Float(2.0)));
        assert!(!Val::Int(2).loosely_equals(&Val::Str("2".to_string())));
        assert!(Val::List(vec![Val::Int(1)]).loosely_equals(&Val::List(vec![Val::Float(1.0)])));
    }

    #[test]
    fn test_display_null_is_empty() {
        assert_eq!(Val::Null.to_string(), "");
        assert_eq!(Val::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Val::List(vec![Val::Int(1), Val::Str("x".to_string())]).to_string(),
            "[1, x]"
        );
    }
}
