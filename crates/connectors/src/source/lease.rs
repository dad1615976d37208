use crate::error::ConnectorError;
use model::core::identifiers::{SourceDialect, SourceRef};
use std::any::Any;
use tracing::debug;

/// A physical connection handed out by a data source provider.
///
/// Dialect strategies recover the concrete driver type through `as_any_mut`.
pub trait Connection: Send {
    fn dialect(&self) -> SourceDialect;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl Connection for mysql_async::Conn {
    fn dialect(&self) -> SourceDialect {
        SourceDialect::MySql
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl Connection for tokio_postgres::Client {
    fn dialect(&self) -> SourceDialect {
        SourceDialect::Postgres
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

type ReleaseFn = Box<dyn FnOnce(Box<dyn Connection>) + Send>;

/// Scoped ownership of a pooled connection.
///
/// The connection goes back to its pool exactly once, when the lease is
/// dropped, whichever way the holder exits.
pub struct Lease {
    source: SourceRef,
    conn: Option<Box<dyn Connection>>,
    release: Option<ReleaseFn>,
}

impl Lease {
    pub fn new(source: SourceRef, conn: Box<dyn Connection>) -> Self {
        debug!(source = %source, dialect = %conn.dialect(), "Leased connection");
        Self {
            source,
            conn: Some(conn),
            release: None,
        }
    }

    /// Runs `release` with the connection instead of dropping it.
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce(Box<dyn Connection>) + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn connection_mut(&mut self) -> Result<&mut dyn Connection, ConnectorError> {
        match self.conn.as_mut() {
            Some(conn) => {
                let conn: &mut dyn Connection = conn.as_mut();
                Ok(conn)
            }
            None => Err(ConnectorError::Closed),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!(source = %self.source, "Releasing connection");
            match self.release.take() {
                Some(release) => release(conn),
                None => drop(conn),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tracing_test::traced_test;

    struct FakeConnection;

    impl Connection for FakeConnection {
        fn dialect(&self) -> SourceDialect {
            SourceDialect::MySql
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    #[test]
    #[traced_test]
    fn release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let mut lease = Lease::new(SourceRef::from("src"), Box::new(FakeConnection)).with_release(
            move |conn| {
                assert!(conn.into_any().downcast::<FakeConnection>().is_ok());
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(lease.connection_mut().is_ok());
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(lease);

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Releasing connection"));
    }
}
