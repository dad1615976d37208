use crate::{
    error::DialectError,
    source::{config::ConnectionParams, lease::Connection},
    sql::{
        base::{cursor::RowCursor, dialect::SqlDialect, query::generator::DumpQuery, row::CursorRow},
        mysql::strategy::MySqlStrategy,
        postgres::strategy::PgStrategy,
    },
};
use async_trait::async_trait;
use model::core::{data_type::ColumnInfo, identifiers::SourceDialect, value::Value};
use std::sync::Arc;

/// Per-engine capabilities the dump engine relies on.
///
/// The engine is agnostic to how an engine avoids client-side buffering of
/// a large result; that incantation lives entirely in `open_cursor`.
#[async_trait]
pub trait DialectStrategy: Send + Sync {
    fn kind(&self) -> SourceDialect;

    /// SQL rendering rules used to build the dump query.
    fn sql(&self) -> &dyn SqlDialect;

    /// Driver parameters appended to the source URL before its pool is created.
    fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new()
    }

    /// Opens a forward-only, non-buffering cursor for `query` on `conn`.
    async fn open_cursor<'c>(
        &self,
        conn: &'c mut dyn Connection,
        query: &DumpQuery,
        batch_size_hint: usize,
    ) -> Result<Box<dyn RowCursor + 'c>, DialectError>;

    /// Converts the cell at `index` into its canonical value.
    fn decode_value(
        &self,
        row: &dyn CursorRow,
        index: usize,
        column: &ColumnInfo,
    ) -> Result<Value, DialectError>;
}

pub fn strategy_for(dialect: SourceDialect) -> Arc<dyn DialectStrategy> {
    match dialect {
        SourceDialect::MySql => Arc::new(MySqlStrategy),
        SourceDialect::Postgres => Arc::new(PgStrategy),
    }
}
