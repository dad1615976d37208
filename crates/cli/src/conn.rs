use crate::error::CliError;
use async_trait::async_trait;
use connectors::source::{
    config::{ConnectionParams, DataSourceConfig, PoolConfig},
    lease::Connection,
    pool::PooledDataSourceProvider,
    provider::DataSourceProvider,
};
use model::core::identifiers::{SourceDialect, SourceRef};
use mysql_async::prelude::*;
use tracing::{error, info};

/// Trait for "pinging" a data source
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// Pings through the same pooled provider the dump command uses, so a
/// successful ping means the dumper can lease a connection too.
pub struct PooledConnectionPinger {
    pub dialect: SourceDialect,
    pub conn_str: String,
}

impl PooledConnectionPinger {
    pub fn new(dialect: SourceDialect, conn_str: impl Into<String>) -> Self {
        Self {
            dialect,
            conn_str: conn_str.into(),
        }
    }
}

#[async_trait]
impl ConnectionPinger for PooledConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!(dialect = %self.dialect, "Pinging source");

        let source = SourceRef::from("ping");
        let provider = PooledDataSourceProvider::new(PoolConfig { max_connections: 1 })
            .with_source(
                source.clone(),
                DataSourceConfig::new(self.dialect, self.conn_str.clone()),
            );

        let result = match provider.acquire(&source, &ConnectionParams::new()).await {
            Ok(mut lease) => match lease.connection_mut() {
                Ok(conn) => select_one(self.dialect, conn).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        };
        provider.close().await;

        match &result {
            Ok(()) => info!(dialect = %self.dialect, "Ping succeeded"),
            Err(e) => error!(dialect = %self.dialect, error = %e, "Ping failed"),
        }
        result
    }
}

async fn select_one(dialect: SourceDialect, conn: &mut dyn Connection) -> Result<(), CliError> {
    let mismatch =
        || CliError::Unexpected(format!("provider returned a connection that is not {dialect}"));

    let val: i32 = match dialect {
        SourceDialect::MySql => {
            let conn = conn
                .as_any_mut()
                .downcast_mut::<mysql_async::Conn>()
                .ok_or_else(mismatch)?;
            conn.query_first("SELECT 1")
                .await?
                .ok_or_else(|| CliError::Unexpected("ping returned no result".into()))?
        }
        SourceDialect::Postgres => {
            let client = conn
                .as_any_mut()
                .downcast_mut::<tokio_postgres::Client>()
                .ok_or_else(mismatch)?;
            client.query_one("SELECT 1", &[]).await?.try_get(0)?
        }
    };

    if val != 1 {
        return Err(CliError::Unexpected(format!(
            "ping returned unexpected result: {val}"
        )));
    }
    Ok(())
}
