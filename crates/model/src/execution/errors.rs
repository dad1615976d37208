use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inconsistencies detected in a dump task configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("table name is empty")]
    EmptyTable,

    #[error("no columns to project for table '{0}'")]
    NoColumns(String),

    #[error("column '{0}' is projected more than once")]
    DuplicateColumn(String),

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("{0} bound is a key position but the task has no unique key column")]
    KeyBoundWithoutKey(&'static str),

    #[error("{0} bound is an offset position but the task has a unique key column")]
    OffsetBoundWithKey(&'static str),

    #[error("{0} bound is NULL")]
    NullBound(&'static str),

    #[error("lower bound {lower} is greater than upper bound {upper}")]
    InvertedRange { lower: String, upper: String },

    #[error("bounds {lower} and {upper} are not comparable")]
    IncomparableBounds { lower: String, upper: String },
}

/// Category of a terminal failure reported on the record channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    QueryBuild,
    Dialect,
    RowDecode,
    Channel,
    Cancelled,
    /// A bug in the dumper or its strategy, such as a panic while decoding.
    Internal,
}

/// Serializable cause attached to a `Failed` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureCause {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
