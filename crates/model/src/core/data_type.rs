use serde::{Deserialize, Serialize};
use std::fmt;

/// Dialect-neutral classification of a source column, resolved from the
/// cursor's result metadata before any row is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int,
    IntUnsigned,
    Float,
    Decimal,
    String,
    Bytes,
    Json,
    Uuid,
    Enum,
    /// MySQL `YEAR`; an integer, never a date.
    Year,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    /// PostgreSQL `INTERVAL`.
    Interval,
    /// Anything without a canonical mapping, keyed by the engine's type name.
    Other(String),
}

impl DataType {
    /// Temporal columns are carried as text in the canonical record.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date
                | DataType::Time
                | DataType::TimeTz
                | DataType::Timestamp
                | DataType::TimestampTz
                | DataType::Interval
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int | DataType::IntUnsigned | DataType::Year)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Other(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Column of a dump cursor as reported by the source engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    /// Engine-native type name, kept for diagnostics.
    pub native_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: DataType, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            native_type: native_type.into(),
        }
    }
}
