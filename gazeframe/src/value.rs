use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::Deserialize;

use crate::FrameError;

/// A single loosely-typed cell.
///
/// Values extracted from message lines start out as strings. A schema override
/// can later cast a whole column to one of the other variants.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert to `to`, returning `None` if the value has no representation
    /// in the target type. Nulls stay null.
    pub fn cast(&self, to: DataType) -> Option<Value> {
        match (self, to) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Bool(b), DataType::Bool) => Some(Value::Bool(*b)),
            (Value::Bool(b), DataType::Int) => Some(Value::Int(*b as i64)),
            (Value::Bool(b), DataType::Float) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
            (Value::Int(i), DataType::Bool) => match i {
                0 => Some(Value::Bool(false)),
                1 => Some(Value::Bool(true)),
                _ => None,
            },
            (Value::Int(i), DataType::Int) => Some(Value::Int(*i)),
            (Value::Int(i), DataType::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(_), DataType::Bool) => None,
            (Value::Float(f), DataType::Int) => {
                if f.fract() == 0.0 && f.is_finite() {
                    Some(Value::Int(*f as i64))
                } else {
                    None
                }
            }
            (Value::Float(f), DataType::Float) => Some(Value::Float(*f)),
            (Value::Str(s), DataType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Value::Str(s), DataType::Int) => s.trim().parse().ok().map(Value::Int),
            (Value::Str(s), DataType::Float) => s.trim().parse().ok().map(Value::Float),
            (v, DataType::Str) => Some(Value::Str(v.to_string())),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Bits under which a float keys a partition map: every NaN is one key and
/// `-0.0` is `0.0`.
fn float_key(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_key(*a) == float_key(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => (),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => float_key(*f).hash(state),
            Value::Str(s) => s.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Target type of a schema override.
#[derive(Debug, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Str => "str",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DataType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<DataType, FrameError> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Bool),
            "int" | "int64" | "integer" => Ok(DataType::Int),
            "float" | "float64" => Ok(DataType::Float),
            "str" | "string" | "utf8" => Ok(DataType::Str),
            _ => Err(FrameError::UnknownDataType(s.to_string())),
        }
    }
}

/// Cast every cell of `column`, failing on the first cell with no
/// representation in `to`.
pub(crate) fn cast_column(name: &str, column: &mut Vec<Value>, to: DataType) -> Result<(), FrameError> {
    for cell in column.iter_mut() {
        match cell.cast(to) {
            Some(v) => *cell = v,
            None => {
                return Err(FrameError::Cast {
                    column: name.to_string(),
                    value: cell.to_string(),
                    to,
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Value::from("12"), DataType::Int, Some(Value::Int(12)); "str to int")]
    #[test_case(Value::from("1.5"), DataType::Float, Some(Value::Float(1.5)); "str to float")]
    #[test_case(Value::from("abc"), DataType::Int, None; "bad str to int")]
    #[test_case(Value::Float(2.0), DataType::Int, Some(Value::Int(2)); "integral float to int")]
    #[test_case(Value::Float(2.5), DataType::Int, None; "fractional float to int")]
    #[test_case(Value::Null, DataType::Float, Some(Value::Null); "null stays null")]
    #[test_case(Value::Int(3), DataType::Str, Some(Value::from("3")); "int to str")]
    #[test_case(Value::from("true"), DataType::Bool, Some(Value::Bool(true)); "str to bool")]
    fn test_cast(value: Value, to: DataType, expected: Option<Value>) {
        assert_eq!(value.cast(to), expected);
    }

    #[test]
    fn test_cast_column_error() {
        let mut column = vec![Value::from("1"), Value::from("x")];
        let err = cast_column("trial_id", &mut column, DataType::Int).unwrap_err();
        assert_eq!(
            err,
            FrameError::Cast {
                column: "trial_id".into(),
                value: "x".into(),
                to: DataType::Int
            }
        );
    }

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test_case(Value::Float(0.0), Value::Float(-0.0); "signed zeros")]
    #[test_case(Value::Float(f64::NAN), Value::Float(-f64::NAN); "nans")]
    #[test_case(Value::Float(1.5), Value::Float(1.5); "plain floats")]
    fn test_equal_floats_hash_equal(a: Value, b: Value) {
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_float_is_not_int() {
        assert_ne!(Value::Float(1.0), Value::Int(1));
        assert_ne!(Value::Float(1.0), Value::Float(2.0));
    }

    #[test]
    fn test_datatype_from_str() {
        assert_eq!("Float64".parse::<DataType>().unwrap(), DataType::Float);
        assert!("complex".parse::<DataType>().is_err());
    }
}
