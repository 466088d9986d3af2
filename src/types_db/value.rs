use std::fmt;

use crate::types_db::type_id::TypeId;

/// A single column value. The engine core only needs equality, ordering,
/// hashing and integer arithmetic, so the type is deliberately small.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Varchar(String),
}

impl Value {
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(TypeId::Boolean),
            Value::Integer(_) => Some(TypeId::Integer),
            Value::Varchar(_) => Some(TypeId::Varchar),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness of a predicate result. Null is not true.
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer addition; anything else yields Null.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Integer(lhs), Value::Integer(rhs)) => Value::Integer(lhs + rhs),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Varchar(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}
