use connectors::error::ConnectorError;
use model::execution::errors::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the configuration file: {0}")]
    ConfigFileRead(#[from] std::io::Error),

    #[error("Failed to deserialize the task configuration as JSON: {0}")]
    ConfigDeserialize(#[from] serde_json::Error),

    #[error("Invalid task configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Missing argument: --{0} (or provide --config)")]
    MissingArgument(&'static str),

    #[error("Invalid bound '{0}': offsets must be non-negative integers")]
    InvalidBound(String),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Failed to write output: {0}")]
    Output(std::io::Error),

    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Dump task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
