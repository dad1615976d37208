use crate::{error::DialectError, sql::base::row::CursorRow};
use async_trait::async_trait;
use model::core::data_type::ColumnInfo;

/// Forward-only iterator over the result of a dump query.
///
/// Implementations never materialize the full result set client-side; a
/// dropped cursor releases its server-side resources.
#[async_trait]
pub trait RowCursor: Send {
    /// Columns of the select list, in order.
    fn columns(&self) -> &[ColumnInfo];

    /// Pulls the next row, or `None` once the result is exhausted.
    async fn next_row(&mut self) -> Result<Option<Box<dyn CursorRow>>, DialectError>;
}
