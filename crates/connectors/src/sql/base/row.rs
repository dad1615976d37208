use std::{any::Any, fmt::Debug};

/// A row pulled from a dump cursor, in the driver's native representation.
///
/// Only the dialect strategy that opened the cursor knows the concrete type;
/// it recovers it through `as_any`.
pub trait CursorRow: Send + Debug {
    fn as_any(&self) -> &dyn Any;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CursorRow for mysql_async::Row {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        mysql_async::Row::len(self)
    }
}

impl CursorRow for tokio_postgres::Row {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        tokio_postgres::Row::len(self)
    }
}
