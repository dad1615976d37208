use crate::{
    error::DialectError,
    sql::base::{cursor::RowCursor, row::CursorRow},
};
use async_trait::async_trait;
use model::core::data_type::ColumnInfo;
use mysql_async::{BinaryProtocol, QueryResult};

/// Unbuffered cursor over a binary-protocol result set.
///
/// Rows are read off the wire one at a time; dropping the cursor drains the
/// remainder of the result so the connection goes back to the pool clean.
pub struct MySqlCursor<'c> {
    result: QueryResult<'c, 'static, BinaryProtocol>,
    columns: Vec<ColumnInfo>,
}

impl<'c> MySqlCursor<'c> {
    pub fn new(result: QueryResult<'c, 'static, BinaryProtocol>, columns: Vec<ColumnInfo>) -> Self {
        Self { result, columns }
    }
}

#[async_trait]
impl RowCursor for MySqlCursor<'_> {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Box<dyn CursorRow>>, DialectError> {
        let row = self.result.next().await?;
        Ok(row.map(|row| Box::new(row) as Box<dyn CursorRow>))
    }
}
