use crate::{error::ConnectorError, source::{config::ConnectionParams, lease::Lease}};
use async_trait::async_trait;
use model::core::identifiers::SourceRef;

/// Hands out pooled physical connections to dump engines.
///
/// Implementations must be safe under concurrent `acquire` calls from many
/// engines. Acquisition may block until a connection frees up; any retry
/// policy belongs to the implementation, never to the caller.
#[async_trait]
pub trait DataSourceProvider: Send + Sync {
    /// Leases a connection to `source`. `params` are the dialect's driver
    /// tuning parameters, applied when the pool for `source` is created.
    async fn acquire(
        &self,
        source: &SourceRef,
        params: &ConnectionParams,
    ) -> Result<Lease, ConnectorError>;
}
