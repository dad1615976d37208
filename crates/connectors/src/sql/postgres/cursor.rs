use crate::{
    error::DialectError,
    sql::base::{cursor::RowCursor, row::CursorRow},
};
use async_trait::async_trait;
use model::core::data_type::ColumnInfo;
use std::collections::VecDeque;
use tokio_postgres::{Portal, Row, Transaction};
use tracing::trace;

/// Server-side cursor over a bound portal.
///
/// The portal lives inside a read-only transaction that is rolled back when
/// the cursor is dropped. Rows are fetched `fetch_size` at a time.
pub struct PgCursor<'c> {
    tx: Transaction<'c>,
    portal: Portal,
    columns: Vec<ColumnInfo>,
    buffer: VecDeque<Row>,
    fetch_size: i32,
    exhausted: bool,
}

impl<'c> PgCursor<'c> {
    pub fn new(tx: Transaction<'c>, portal: Portal, columns: Vec<ColumnInfo>, fetch_size: i32) -> Self {
        Self {
            tx,
            portal,
            columns,
            buffer: VecDeque::new(),
            fetch_size,
            exhausted: false,
        }
    }

    async fn fill(&mut self) -> Result<(), DialectError> {
        let rows = self.tx.query_portal(&self.portal, self.fetch_size).await?;
        // A short batch means the portal ran dry; skip the empty round trip.
        if rows.len() < self.fetch_size as usize {
            self.exhausted = true;
        }
        trace!(rows = rows.len(), "Fetched portal batch");
        self.buffer.extend(rows);
        Ok(())
    }
}

#[async_trait]
impl RowCursor for PgCursor<'_> {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Box<dyn CursorRow>>, DialectError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        Ok(self
            .buffer
            .pop_front()
            .map(|row| Box::new(row) as Box<dyn CursorRow>))
    }
}
