use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// Resume and ordering marker attached to every dumped record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Position {
    /// Value of the unique key column of the row.
    Key(Value),

    /// Zero-based row number within the scan of a table without a unique key.
    Offset(u64),
}

impl Position {
    pub fn key(value: impl Into<Value>) -> Self {
        Position::Key(value.into())
    }

    /// Orders two positions of the same family. Keys follow [`Value::compare`];
    /// a key and an offset are never comparable.
    pub fn compare(&self, other: &Position) -> Option<Ordering> {
        match (self, other) {
            (Position::Key(a), Position::Key(b)) => a.compare(b),
            (Position::Offset(a), Position::Offset(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Like [`Position::compare`], but only for positions whose order does
    /// not depend on the source engine: offsets and numeric keys.
    pub fn intrinsic_cmp(&self, other: &Position) -> Option<Ordering> {
        if self.has_intrinsic_order() && other.has_intrinsic_order() {
            self.compare(other)
        } else {
            None
        }
    }

    pub fn has_intrinsic_order(&self) -> bool {
        match self {
            Position::Key(v) => v.is_numeric(),
            Position::Offset(_) => true,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Position::Key(_))
    }

    pub fn as_key(&self) -> Option<&Value> {
        match self {
            Position::Key(v) => Some(v),
            Position::Offset(_) => None,
        }
    }

    pub fn as_offset(&self) -> Option<u64> {
        match self {
            Position::Offset(o) => Some(*o),
            Position::Key(_) => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Key(v) => write!(f, "key={v}"),
            Position::Offset(o) => write!(f, "offset={o}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_offsets_do_not_mix() {
        assert_eq!(Position::key(3i64).compare(&Position::Offset(3)), None);
        assert_eq!(
            Position::Offset(2).compare(&Position::Offset(9)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn string_keys_order_lexically() {
        assert_eq!(
            Position::key("b").compare(&Position::key("abc")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn only_numbers_and_offsets_have_intrinsic_order() {
        assert_eq!(
            Position::key(2i64).intrinsic_cmp(&Position::key(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Position::Offset(7).intrinsic_cmp(&Position::Offset(7)),
            Some(Ordering::Equal)
        );
        assert_eq!(Position::key("b").intrinsic_cmp(&Position::key("A")), None);
        assert!(!Position::Key(Value::Temporal("2024-01-01".into())).has_intrinsic_order());
    }
}
