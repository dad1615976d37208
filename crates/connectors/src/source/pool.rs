use crate::{
    error::ConnectorError,
    source::{
        config::{ConnectionParams, DataSourceConfig, PoolConfig},
        lease::Lease,
        provider::DataSourceProvider,
    },
    sql::postgres::pool::PgPool,
};
use async_trait::async_trait;
use model::core::identifiers::{SourceDialect, SourceRef};
use mysql_async::{Opts, OptsBuilder, Pool as MySqlPool, PoolConstraints, PoolOpts};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone)]
enum SourcePool {
    MySql(MySqlPool),
    Postgres(Arc<PgPool>),
}

/// Data source provider backed by one lazily created pool per source.
///
/// Pools are created on first acquisition and reused by every later task
/// dumping from the same source, whichever table or split it covers.
pub struct PooledDataSourceProvider {
    configs: HashMap<SourceRef, DataSourceConfig>,
    pool_config: PoolConfig,
    pools: Mutex<HashMap<SourceRef, SourcePool>>,
    closed: AtomicBool,
}

impl PooledDataSourceProvider {
    pub fn new(pool_config: PoolConfig) -> Self {
        Self {
            configs: HashMap::new(),
            pool_config,
            pools: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, source: SourceRef, config: DataSourceConfig) {
        self.configs.insert(source, config);
    }

    pub fn with_source(mut self, source: SourceRef, config: DataSourceConfig) -> Self {
        self.register(source, config);
        self
    }

    async fn pool_for(
        &self,
        source: &SourceRef,
        params: &ConnectionParams,
    ) -> Result<SourcePool, ConnectorError> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(source) {
            return Ok(pool.clone());
        }

        let mut config = self
            .configs
            .get(source)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownSource(source.to_string()))?;
        config.append_params(params.clone());

        let max = self.pool_config.max_connections.max(1);
        let pool = match config.dialect {
            SourceDialect::MySql => {
                let opts = Opts::from_url(&config.connection_url())
                    .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
                let constraints = PoolConstraints::new(0, max).ok_or_else(|| {
                    ConnectorError::InvalidUrl(format!("invalid pool size {max}"))
                })?;
                let opts = OptsBuilder::from_opts(opts)
                    .pool_opts(PoolOpts::default().with_constraints(constraints));
                SourcePool::MySql(MySqlPool::new(opts))
            }
            SourceDialect::Postgres => {
                SourcePool::Postgres(Arc::new(PgPool::new(config.connection_url(), max)))
            }
        };

        info!(source = %source, dialect = %config.dialect, max_connections = max, "Created connection pool");
        pools.insert(source.clone(), pool.clone());
        Ok(pool)
    }

    /// Closes every pool. Leases still held stay usable until dropped;
    /// further acquisitions fail.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pools: Vec<(SourceRef, SourcePool)> = self.pools.lock().await.drain().collect();

        for (source, pool) in pools {
            match pool {
                SourcePool::MySql(pool) => {
                    if let Err(error) = pool.disconnect().await {
                        warn!(source = %source, %error, "Failed to disconnect MySQL pool");
                    }
                }
                SourcePool::Postgres(pool) => pool.close(),
            }
            info!(source = %source, "Closed connection pool");
        }
    }
}

#[async_trait]
impl DataSourceProvider for PooledDataSourceProvider {
    async fn acquire(
        &self,
        source: &SourceRef,
        params: &ConnectionParams,
    ) -> Result<Lease, ConnectorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectorError::Closed);
        }

        match self.pool_for(source, params).await? {
            SourcePool::MySql(pool) => {
                let conn = pool.get_conn().await?;
                Ok(Lease::new(source.clone(), Box::new(conn)))
            }
            SourcePool::Postgres(pool) => pool.acquire(source).await,
        }
    }
}
