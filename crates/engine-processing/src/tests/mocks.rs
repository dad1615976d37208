use async_trait::async_trait;
use connectors::{
    error::{ConnectorError, DialectError},
    source::{
        config::ConnectionParams,
        lease::{Connection, Lease},
        provider::DataSourceProvider,
    },
    sql::base::{
        cursor::RowCursor,
        dialect::{MySql, SqlDialect},
        query::generator::DumpQuery,
        row::CursorRow,
        strategy::DialectStrategy,
    },
};
use model::{
    core::{
        data_type::{ColumnInfo, DataType},
        identifiers::{SourceDialect, SourceRef},
        value::Value,
    },
    execution::dump_task::DumpTaskConfig,
    pagination::position::Position,
};
use std::{
    any::Any,
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Semaphore;

/// In-memory table standing in for a source database.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    /// `orders(id, name)` with ids `1..=count`.
    pub fn orders(count: i64) -> Self {
        MemoryTable {
            columns: vec![
                ColumnInfo::new("id", DataType::Int, "BIGINT"),
                ColumnInfo::new("name", DataType::String, "VARCHAR"),
            ],
            rows: (1..=count)
                .map(|id| vec![Value::Int(id), Value::String(format!("item-{id}"))])
                .collect(),
        }
    }

    pub fn set(mut self, row: usize, column: usize, value: Value) -> Self {
        self.rows[row][column] = value;
        self
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    table: Arc<MemoryTable>,
}

impl Connection for MemoryConnection {
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

pub struct MemoryProvider {
    table: Arc<MemoryTable>,
    fail: bool,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new(table: MemoryTable) -> Self {
        Self {
            table: Arc::new(table),
            fail: false,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(MemoryTable::orders(0))
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSourceProvider for MemoryProvider {
    async fn acquire(
        &self,
        source: &SourceRef,
        _params: &ConnectionParams,
    ) -> Result<Lease, ConnectorError> {
        if self.fail {
            return Err(ConnectorError::UnknownSource(source.to_string()));
        }

        self.acquired.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        let conn = MemoryConnection {
            table: Arc::clone(&self.table),
        };
        Ok(Lease::new(source.clone(), Box::new(conn)).with_release(move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[derive(Debug)]
pub struct MemoryRow(Vec<Value>);

impl CursorRow for MemoryRow {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

pub struct MemoryCursor {
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Vec<Value>>,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Box<dyn CursorRow>>, DialectError> {
        // each fetch consumes one permit, so a test decides when rows arrive
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        tokio::task::yield_now().await;
        Ok(self
            .rows
            .pop_front()
            .map(|row| Box::new(MemoryRow(row)) as Box<dyn CursorRow>))
    }
}

/// Strategy that "executes" a dump query by applying the task's slice to a
/// [`MemoryTable`], and records the SQL it was handed.
pub struct MemoryStrategy {
    config: DumpTaskConfig,
    pub queries: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    panic_on_key: Option<i64>,
}

impl MemoryStrategy {
    pub fn new(config: DumpTaskConfig) -> Self {
        Self {
            config,
            queries: Mutex::new(Vec::new()),
            gate: None,
            panic_on_key: None,
        }
    }

    /// Cursors only fetch a row after taking a permit from `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Decoding the row whose first column is `key` panics.
    pub fn panicking_on_key(mut self, key: i64) -> Self {
        self.panic_on_key = Some(key);
        self
    }

    pub fn last_query(&self) -> String {
        self.queries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DialectStrategy for MemoryStrategy {
    fn kind(&self) -> SourceDialect {
        SourceDialect::MySql
    }

    fn sql(&self) -> &dyn SqlDialect {
        &MySql
    }

    async fn open_cursor<'c>(
        &self,
        conn: &'c mut dyn Connection,
        query: &DumpQuery,
        _batch_size_hint: usize,
    ) -> Result<Box<dyn RowCursor + 'c>, DialectError> {
        let table = conn
            .as_any_mut()
            .downcast_mut::<MemoryConnection>()
            .map(|c| Arc::clone(&c.table))
            .ok_or(DialectError::ConnectionMismatch("memory"))?;
        self.queries.lock().unwrap().push(query.sql.clone());

        let mut projection: Vec<usize> = query
            .columns
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect();
        let key_column = self
            .config
            .unique_key
            .as_deref()
            .and_then(|key| table.column_index(key));
        if let (Some(key), Some(index)) = (key_column, query.key_index)
            && index == query.columns.len()
        {
            projection.push(key);
        }

        let rows: VecDeque<Vec<Value>> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(offset, row)| {
                let position = match key_column {
                    Some(key) => Position::Key(row[key].clone()),
                    None => Position::Offset(*offset as u64),
                };
                self.config.contains(&position)
            })
            .map(|(_, row)| projection.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Box::new(MemoryCursor {
            columns: projection.iter().map(|&i| table.columns[i].clone()).collect(),
            rows,
            gate: self.gate.clone(),
        }))
    }

    fn decode_value(
        &self,
        row: &dyn CursorRow,
        index: usize,
        column: &ColumnInfo,
    ) -> Result<Value, DialectError> {
        let row = row
            .as_any()
            .downcast_ref::<MemoryRow>()
            .ok_or(DialectError::RowMismatch("memory"))?;
        let value = row.0.get(index).ok_or(DialectError::ColumnOutOfRange(index))?;
        if let (0, Some(key), Value::Int(id)) = (index, self.panic_on_key, value)
            && key == *id
        {
            panic!("corrupt row {id}");
        }

        match (value, &column.data_type) {
            (Value::Bytes(_), DataType::String) => {
                Err(DialectError::decode(&column.name, "invalid utf-8 sequence"))
            }
            (value, _) => Ok(value.clone()),
        }
    }
}
