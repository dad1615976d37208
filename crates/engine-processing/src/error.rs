use connectors::error::{ConnectorError, DialectError, QueryBuildError};
use engine_core::error::ChannelError;
use model::execution::errors::{FailureCause, FailureKind};
use std::any::Any;
use thiserror::Error;

/// Why a dump task ended without delivering every row of its slice.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Failed to acquire a source connection: {0}")]
    Connection(#[from] ConnectorError),

    #[error("Failed to build dump query: {0}")]
    QueryBuild(#[from] QueryBuildError),

    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),

    #[error("Failed to decode column '{column}': {source}")]
    RowDecode {
        column: String,
        #[source]
        source: DialectError,
    },

    #[error("Dump cancelled")]
    Cancelled,

    #[error("Record channel error: {0}")]
    ChannelClosed(#[from] ChannelError),

    #[error("Dump panicked: {0}")]
    Panicked(String),
}

impl DumpError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DumpError::Connection(_) => FailureKind::Connection,
            DumpError::QueryBuild(_) => FailureKind::QueryBuild,
            DumpError::Dialect(_) => FailureKind::Dialect,
            DumpError::RowDecode { .. } => FailureKind::RowDecode,
            DumpError::Cancelled => FailureKind::Cancelled,
            DumpError::ChannelClosed(_) => FailureKind::Channel,
            DumpError::Panicked(_) => FailureKind::Internal,
        }
    }

    /// Wraps the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        };
        DumpError::Panicked(message)
    }

    /// The serializable cause carried by a `Failed` marker.
    pub fn failure_cause(&self) -> FailureCause {
        FailureCause::new(self.kind(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_decode_cause_names_the_column() {
        let err = DumpError::RowDecode {
            column: "created_at".to_string(),
            source: DialectError::decode("created_at", "invalid utf-8"),
        };
        let cause = err.failure_cause();
        assert_eq!(cause.kind, FailureKind::RowDecode);
        assert!(cause.message.contains("created_at"));
    }

    #[test]
    fn test_panic_payloads_become_internal_failures() {
        let err = DumpError::from_panic(Box::new(format!("bad row {}", 6)));
        assert_eq!(err.kind(), FailureKind::Internal);
        assert_eq!(err.to_string(), "Dump panicked: bad row 6");

        let err = DumpError::from_panic(Box::new("static message"));
        assert!(matches!(err, DumpError::Panicked(ref m) if m == "static message"));

        let err = DumpError::from_panic(Box::new(42u8));
        assert!(matches!(err, DumpError::Panicked(ref m) if m == "non-string panic payload"));
    }
}
