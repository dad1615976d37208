use model::core::identifiers::SourceDialect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection parameters appended to a source URL as query parameters.
pub type ConnectionParams = BTreeMap<String, String>;

/// Physical connection settings of one source data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub dialect: SourceDialect,
    pub url: String,
    #[serde(default)]
    pub params: ConnectionParams,
}

impl DataSourceConfig {
    pub fn new(dialect: SourceDialect, url: impl Into<String>) -> Self {
        Self {
            dialect,
            url: url.into(),
            params: ConnectionParams::new(),
        }
    }

    /// Merges driver parameters into this configuration. Later values win.
    pub fn append_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.params.insert(key.into(), value.into());
        }
    }

    /// The URL handed to the driver, with appended parameters rendered as
    /// query parameters. Parameters already present in the URL are replaced.
    pub fn connection_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }

        let (base, query) = match self.url.split_once('?') {
            Some((base, query)) => (base, query),
            None => (self.url.as_str(), ""),
        };

        let mut pairs: Vec<String> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
                !self.params.contains_key(key)
            })
            .map(str::to_string)
            .collect();
        pairs.extend(self.params.iter().map(|(k, v)| format!("{k}={v}")));

        format!("{base}?{}", pairs.join("&"))
    }
}

/// Sizing of the per-source connection pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_params_to_plain_url() {
        let mut config = DataSourceConfig::new(SourceDialect::MySql, "mysql://u:p@localhost/db");
        config.append_params([("stmt_cache_size", "0")]);
        assert_eq!(
            config.connection_url(),
            "mysql://u:p@localhost/db?stmt_cache_size=0"
        );
    }

    #[test]
    fn appended_params_replace_existing_query_params() {
        let mut config = DataSourceConfig::new(
            SourceDialect::Postgres,
            "postgres://u@localhost/db?sslmode=disable&application_name=psql",
        );
        config.append_params([("application_name", "dumper")]);
        assert_eq!(
            config.connection_url(),
            "postgres://u@localhost/db?sslmode=disable&application_name=dumper"
        );
    }

    #[test]
    fn url_without_params_is_untouched() {
        let config = DataSourceConfig::new(SourceDialect::Postgres, "postgres://localhost/db");
        assert_eq!(config.connection_url(), "postgres://localhost/db");
    }
}
