use crate::{
    dumper::{control::DumpControl, handle::DumpHandle},
    error::DumpError,
};
use connectors::{
    error::DialectError,
    source::provider::DataSourceProvider,
    sql::base::{
        query::generator::DumpQuery,
        strategy::{DialectStrategy, strategy_for},
    },
};
use engine_core::channel::RecordSender;
use model::{
    core::value::{FieldValue, Value},
    execution::{dump_task::DumpTaskConfig, state::DumpState},
    pagination::position::Position,
    records::record::{Record, StreamItem},
};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub mod control;
pub mod handle;

/// Extracts one slice of one table into a record channel.
///
/// A dumper runs exactly once: `start` consumes it. It leases a single
/// connection for the whole run and gives it back before the terminal
/// marker is pushed, whichever way the run ends.
pub struct InventoryDumper {
    config: DumpTaskConfig,
    provider: Arc<dyn DataSourceProvider>,
    dialect: Arc<dyn DialectStrategy>,
    sender: RecordSender,
    control: Arc<DumpControl>,
    sequence: u64,
}

impl InventoryDumper {
    pub fn new(
        config: DumpTaskConfig,
        provider: Arc<dyn DataSourceProvider>,
        dialect: Arc<dyn DialectStrategy>,
        sender: RecordSender,
    ) -> Self {
        let control = Arc::new(DumpControl::new(config.table.clone()));
        Self {
            config,
            provider,
            dialect,
            sender,
            control,
            sequence: 0,
        }
    }

    /// Dumper using the built-in strategy for the task's dialect.
    pub fn for_source(
        config: DumpTaskConfig,
        provider: Arc<dyn DataSourceProvider>,
        sender: RecordSender,
    ) -> Self {
        let dialect = strategy_for(config.dialect);
        Self::new(config, provider, dialect, sender)
    }

    pub fn handle(&self) -> DumpHandle {
        DumpHandle::new(Arc::clone(&self.control))
    }

    /// Runs the dump on its own tokio task.
    pub fn spawn(self) -> (DumpHandle, JoinHandle<DumpState>) {
        let handle = self.handle();
        let task = tokio::spawn(self.start());
        (handle, task)
    }

    /// Runs the dump to completion and returns its terminal state.
    pub async fn start(mut self) -> DumpState {
        self.control.mark_started();
        info!(
            table = %self.config.table,
            source = %self.config.source,
            dialect = %self.config.dialect,
            lower = ?self.config.lower_bound,
            upper = ?self.config.upper_bound,
            resume_after = ?self.config.resume_after,
            "Starting inventory dump"
        );

        // The cursor and lease live inside `run` and are gone once it returns,
        // including when it unwinds.
        let outcome = AssertUnwindSafe(self.run())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(DumpError::from_panic(payload)));

        let (marker, state) = match &outcome {
            Ok(()) => (StreamItem::Finished, DumpState::Finished),
            Err(DumpError::Cancelled) => (StreamItem::Cancelled, DumpState::Stopped),
            Err(err) => (StreamItem::Failed(err.failure_cause()), DumpState::Failed),
        };

        match &outcome {
            Ok(()) => info!(
                table = %self.config.table,
                records = self.sequence,
                last_position = ?self.control.position.borrow().as_ref(),
                "Dump finished"
            ),
            Err(DumpError::Cancelled) => info!(
                table = %self.config.table,
                records = self.sequence,
                "Dump stopped"
            ),
            Err(err) => {
                self.control.metrics.increment_failures();
                error!(table = %self.config.table, error = %err, "Dump failed");
            }
        }

        if !matches!(outcome, Err(DumpError::ChannelClosed(_)))
            && let Err(err) = self.sender.push(marker).await
        {
            warn!(table = %self.config.table, error = %err, "Consumer gone before the terminal marker");
        }

        self.control.mark_finished(state);
        state
    }

    async fn run(&mut self) -> Result<(), DumpError> {
        self.control.checkpoint().await?;

        let query = DumpQuery::build(&self.config, self.dialect.sql())?;
        let cancel = self.control.cancel.clone();

        let params = self.dialect.connection_params();
        let mut lease = tokio::select! {
            _ = cancel.cancelled() => return Err(DumpError::Cancelled),
            lease = self.provider.acquire(&self.config.source, &params) => lease?,
        };

        let conn = lease.connection_mut()?;
        let mut cursor = self
            .dialect
            .open_cursor(conn, &query, self.config.batch_size)
            .await?;

        let columns = cursor.columns().to_vec();
        let projected = query.columns.len();
        let needed = query.key_index.map_or(projected, |key| projected.max(key + 1));
        if columns.len() < needed {
            return Err(DialectError::ColumnOutOfRange(needed - 1).into());
        }

        let key_name = self.config.unique_key.clone().unwrap_or_default();
        let mut next_offset = query.first_offset;

        loop {
            self.control.checkpoint().await?;

            let Some(row) = cursor.next_row().await? else {
                break;
            };

            let mut values = Vec::with_capacity(projected);
            for (index, name) in query.columns.iter().enumerate() {
                let value = self
                    .dialect
                    .decode_value(&*row, index, &columns[index])
                    .map_err(|source| DumpError::RowDecode {
                        column: name.clone(),
                        source,
                    })?;
                values.push(FieldValue::new(name.clone(), value));
            }

            let position = match query.key_index {
                Some(index) if index < projected => Position::Key(values[index].value.clone()),
                Some(index) => Position::Key(
                    self.dialect
                        .decode_value(&*row, index, &columns[index])
                        .map_err(|source| DumpError::RowDecode {
                            column: key_name.clone(),
                            source,
                        })?,
                ),
                None => {
                    let offset = next_offset;
                    next_offset += 1;
                    Position::Offset(offset)
                }
            };
            drop(row);

            if let Position::Key(Value::Null) = position {
                return Err(DumpError::RowDecode {
                    column: key_name.clone(),
                    source: DialectError::decode(&key_name, "unique key is NULL"),
                });
            }

            let sequence = self.sequence + 1;
            let record = Record::new(values, position.clone(), sequence);
            let bytes = record.size_bytes();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DumpError::Cancelled),
                pushed = self.sender.push(StreamItem::Record(record)) => pushed?,
            }

            self.sequence = sequence;
            debug!(table = %self.config.table, sequence = self.sequence, position = %position, "Emitted record");
            self.control.record_emitted(position, bytes);
        }

        Ok(())
    }
}
