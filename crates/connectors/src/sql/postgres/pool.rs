use crate::{
    error::ConnectorError,
    source::lease::{Connection, Lease},
    sql::postgres::utils::connect_client,
};
use model::core::identifiers::SourceRef;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio_postgres::Client;
use tracing::debug;

/// Bounded pool of PostgreSQL clients.
///
/// A semaphore caps the number of clients out on lease; idle clients are
/// kept for reuse and replaced when the server side has gone away.
pub struct PgPool {
    url: String,
    idle: Mutex<Vec<Client>>,
    permits: Arc<Semaphore>,
}

impl PgPool {
    pub fn new(url: String, max_connections: usize) -> Self {
        Self {
            url,
            idle: Mutex::new(Vec::new()),
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// Waits for a free slot and leases a client, opening a new one when no
    /// live idle client is available.
    pub async fn acquire(self: &Arc<Self>, source: &SourceRef) -> Result<Lease, ConnectorError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ConnectorError::Closed)?;

        let client = match self.take_idle() {
            Some(client) => client,
            None => {
                debug!(source = %source, "Opening PostgreSQL connection");
                connect_client(&self.url).await?
            }
        };

        let pool = Arc::clone(self);
        let lease = Lease::new(source.clone(), Box::new(client)).with_release(
            move |conn: Box<dyn Connection>| {
                if let Ok(client) = conn.into_any().downcast::<Client>() {
                    pool.give_back(*client);
                }
                drop(permit);
            },
        );
        Ok(lease)
    }

    fn take_idle(&self) -> Option<Client> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(client) = idle.pop() {
            if !client.is_closed() {
                return Some(client);
            }
        }
        None
    }

    fn give_back(&self, client: Client) {
        if self.permits.is_closed() || client.is_closed() {
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(client);
    }

    /// Refuses further acquisitions and drops idle clients. Clients on lease
    /// are dropped when their lease ends.
    pub fn close(&self) {
        self.permits.close();
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_pool_refuses_acquisition() {
        let pool = Arc::new(PgPool::new("postgres://localhost/db".to_string(), 2));
        pool.close();
        let result = pool.acquire(&SourceRef::from("src")).await;
        assert!(matches!(result, Err(ConnectorError::Closed)));
    }
}
