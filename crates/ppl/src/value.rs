use std::cmp::Ordering;
use std::fmt;

use num_traits::ToPrimitive;
use serde::Serialize;

use crate::error::{PplError, Result};

/// The value of a random choice or of a model's return.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    List(Vec<Value>),
}

/// Hashable identity of a value; floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Boolean(bool),
    Integer(i64),
    Float(u64),
    List(Vec<ValueKey>),
}

impl Value {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::List(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_float(&self) -> Result<f64> {
        self.as_float().ok_or_else(|| PplError::mismatch("number", self))
    }

    pub fn to_int(&self) -> Result<i64> {
        self.as_int().ok_or_else(|| PplError::mismatch("integer", self))
    }

    pub fn to_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| PplError::mismatch("boolean", self))
    }

    /// Integers and booleans, and lists of them.
    pub fn is_discrete(&self) -> bool {
        match self {
            Value::Boolean(_) | Value::Integer(_) => true,
            Value::Float(_) => false,
            Value::List(items) => items.iter().all(Value::is_discrete),
        }
    }

    pub fn key(&self) -> ValueKey {
        match self {
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Integer(i) => ValueKey::Integer(*i),
            Value::Float(f) => ValueKey::Float(f.to_bits()),
            Value::List(items) => ValueKey::List(items.iter().map(Value::key).collect()),
        }
    }

    /// Total order used to sort posterior supports: numbers by magnitude,
    /// lists lexicographically, lists after scalars.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::List(_), _) => Ordering::Greater,
            (_, Value::List(_)) => Ordering::Less,
            (a, b) => {
                let x = a.as_float().unwrap_or(f64::NAN);
                let y = b.as_float().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        }
    }
}

impl ToPrimitive for Value {
    fn to_f64(&self) -> Option<f64> {
        self.as_float()
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Float(f) => f.to_i64(),
            other => other.as_int(),
        }
    }

    fn to_u64(&self) -> Option<u64> {
        self.to_i64()?.to_u64()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:.4}", x),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
