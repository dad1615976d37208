use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

/// Opaque handle naming a source data source configuration. The data source
/// provider resolves it to a pooled physical connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(Arc<str>);

impl SourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source database engine of a dump task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDialect {
    MySql,
    Postgres,
}

impl SourceDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SourceDialect::MySql => "MySQL",
            SourceDialect::Postgres => "PostgreSQL",
        }
    }
}

impl fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SourceDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SourceDialect::Postgres),
            other => Err(format!("unsupported source dialect: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dialect_aliases() {
        assert_eq!("PG".parse::<SourceDialect>(), Ok(SourceDialect::Postgres));
        assert_eq!("mariadb".parse::<SourceDialect>(), Ok(SourceDialect::MySql));
        assert!("oracle".parse::<SourceDialect>().is_err());
    }

    #[test]
    fn source_ref_is_a_plain_json_string() {
        let source = SourceRef::from("orders-db");
        assert_eq!(serde_json::to_string(&source).unwrap(), r#""orders-db""#);
        let parsed: SourceRef = serde_json::from_str(r#""orders-db""#).unwrap();
        assert_eq!(parsed, source);
    }
}
