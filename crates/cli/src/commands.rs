use crate::error::CliError;
use clap::{Args, Subcommand};
use model::{
    core::{
        identifiers::{SourceDialect, SourceRef},
        value::Value,
    },
    execution::dump_task::{DEFAULT_BATCH_SIZE, DumpTaskConfig},
    pagination::position::Position,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Dump one table slice as JSON lines
    Dump(DumpArgs),

    /// Test a connection string against a given format
    TestConn {
        /// Data format: "mysql" or "pg"
        #[arg(long)]
        format: String,

        /// Connection URL
        #[arg(long, env = "DUMP_SOURCE_URL")]
        conn_str: String,
    },
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    #[arg(long, help = "JSON task configuration file; replaces the task flags below")]
    pub config: Option<String>,

    #[arg(long, env = "DUMP_SOURCE_URL", help = "Source connection URL")]
    pub url: String,

    #[arg(long, help = "Source engine: mysql or postgres")]
    pub dialect: Option<SourceDialect>,

    #[arg(long, help = "Table to dump, optionally schema-qualified")]
    pub table: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Comma-separated columns to project")]
    pub columns: Vec<String>,

    #[arg(long, help = "Unique key column; omit for key-less tables")]
    pub key: Option<String>,

    #[arg(long, help = "Inclusive lower bound (key value, or row offset without --key)")]
    pub lower: Option<String>,

    #[arg(long, help = "Exclusive upper bound (key value, or row offset without --key)")]
    pub upper: Option<String>,

    #[arg(long, help = "Resume strictly after this position")]
    pub resume_after: Option<String>,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1024, help = "Record channel capacity")]
    pub capacity: usize,

    #[arg(long, default_value_t = 4)]
    pub max_connections: usize,

    #[arg(long, help = "Write records to this file instead of stdout")]
    pub output: Option<String>,
}

impl DumpArgs {
    pub async fn task_config(&self) -> Result<DumpTaskConfig, CliError> {
        let config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&raw)?
            }
            None => self.config_from_flags()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn config_from_flags(&self) -> Result<DumpTaskConfig, CliError> {
        let dialect = self.dialect.ok_or(CliError::MissingArgument("dialect"))?;
        let table = self.table.clone().ok_or(CliError::MissingArgument("table"))?;
        if self.columns.is_empty() {
            return Err(CliError::MissingArgument("columns"));
        }

        let keyed = self.key.is_some();
        let mut builder = DumpTaskConfig::builder(table, dialect, SourceRef::from("cli"))
            .columns(self.columns.iter().cloned())
            .batch_size(self.batch_size);
        if let Some(key) = &self.key {
            builder = builder.unique_key(key.clone());
        }
        if let Some(raw) = &self.lower {
            builder = builder.lower_bound(parse_position(raw, keyed)?);
        }
        if let Some(raw) = &self.upper {
            builder = builder.upper_bound(parse_position(raw, keyed)?);
        }
        if let Some(raw) = &self.resume_after {
            builder = builder.resume_after(parse_position(raw, keyed)?);
        }
        Ok(builder.build())
    }
}

/// Integer-looking key bounds become integers, anything else a string.
pub fn parse_position(raw: &str, keyed: bool) -> Result<Position, CliError> {
    if keyed {
        let value = match raw.parse::<i64>() {
            Ok(int) => Value::Int(int),
            Err(_) => Value::String(raw.to_string()),
        };
        return Ok(Position::Key(value));
    }

    raw.parse::<u64>()
        .map(Position::Offset)
        .map_err(|_| CliError::InvalidBound(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_bounds_prefer_integers() {
        assert_eq!(parse_position("42", true).unwrap(), Position::key(42i64));
        assert_eq!(parse_position("abc", true).unwrap(), Position::key("abc"));
    }

    #[test]
    fn offsets_must_be_unsigned() {
        assert_eq!(parse_position("7", false).unwrap(), Position::Offset(7));
        assert!(matches!(
            parse_position("-1", false),
            Err(CliError::InvalidBound(_))
        ));
    }
}
