use model::execution::errors::ConfigError;
use thiserror::Error;

/// Errors raised while acquiring a connection from a data source provider.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The source reference is not registered with the provider.
    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    /// The connection URL could not be parsed.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// TLS connector setup failed.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The provider was closed and hands out no more connections.
    #[error("Data source provider is closed")]
    Closed,
}

/// Errors raised by a dialect strategy while opening or reading a cursor.
#[derive(Debug, Error)]
pub enum DialectError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// The connection handed to the strategy belongs to another engine.
    #[error("Connection is not a {0} connection")]
    ConnectionMismatch(&'static str),

    /// The row handed to the strategy was produced by another engine's cursor.
    #[error("Row is not a {0} row")]
    RowMismatch(&'static str),

    /// The cursor has no column at the requested index.
    #[error("Column index {0} out of range")]
    ColumnOutOfRange(usize),

    /// The column type has no canonical representation.
    #[error("Unsupported type '{native}' for column '{column}'")]
    UnsupportedType { column: String, native: String },

    /// A cell could not be converted into its canonical form.
    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

impl DialectError {
    pub fn decode(column: &str, reason: impl Into<String>) -> Self {
        DialectError::Decode {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building the dump query of a task.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryBuildError {
    #[error("Invalid dump configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot render {0} as a SQL literal")]
    UnsupportedLiteral(String),
}
