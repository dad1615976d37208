use crate::{
    error::DialectError,
    source::{config::ConnectionParams, lease::Connection},
    sql::{
        base::{
            cursor::RowCursor,
            dialect::{MySql, SqlDialect},
            query::generator::DumpQuery,
            row::CursorRow,
            strategy::DialectStrategy,
        },
        mysql::{cursor::MySqlCursor, data_type::column_info},
    },
};
use async_trait::async_trait;
use model::core::{
    data_type::{ColumnInfo, DataType},
    identifiers::SourceDialect,
    value::Value,
};
use mysql_async::{Conn, Row, Value as MySqlValue, prelude::Queryable};
use tracing::debug;

/// MySQL capabilities.
///
/// Streaming comes from executing the statement with `exec_iter`, which
/// hands rows over as they arrive instead of collecting the result set.
/// The fetch-size hint has no meaning for that protocol and is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlStrategy;

#[async_trait]
impl DialectStrategy for MySqlStrategy {
    fn kind(&self) -> SourceDialect {
        SourceDialect::MySql
    }

    fn sql(&self) -> &dyn SqlDialect {
        &MySql
    }

    fn connection_params(&self) -> ConnectionParams {
        // The dump runs one statement per connection; caching it server-side
        // only leaks prepared statements across leases.
        ConnectionParams::from([("stmt_cache_size".to_string(), "0".to_string())])
    }

    async fn open_cursor<'c>(
        &self,
        conn: &'c mut dyn Connection,
        query: &DumpQuery,
        batch_size_hint: usize,
    ) -> Result<Box<dyn RowCursor + 'c>, DialectError> {
        let conn = conn
            .as_any_mut()
            .downcast_mut::<Conn>()
            .ok_or(DialectError::ConnectionMismatch("MySQL"))?;

        debug!(batch_size_hint, "Opening streaming MySQL result; fetch size hint ignored");
        let result = conn.exec_iter(query.sql.clone(), ()).await?;
        let columns = result
            .columns_ref()
            .iter()
            .map(column_info)
            .collect::<Vec<_>>();

        Ok(Box::new(MySqlCursor::new(result, columns)))
    }

    fn decode_value(
        &self,
        row: &dyn CursorRow,
        index: usize,
        column: &ColumnInfo,
    ) -> Result<Value, DialectError> {
        let row = row
            .as_any()
            .downcast_ref::<Row>()
            .ok_or(DialectError::RowMismatch("MySQL"))?;
        let raw = row
            .as_ref(index)
            .ok_or(DialectError::ColumnOutOfRange(index))?;
        decode_mysql_value(raw, column)
    }
}

/// Converts a binary-protocol cell into its canonical value.
///
/// Temporal cells are rendered from their raw components, so zero dates and
/// out-of-range values survive as text rather than failing a native parse.
pub fn decode_mysql_value(raw: &MySqlValue, column: &ColumnInfo) -> Result<Value, DialectError> {
    match raw {
        MySqlValue::NULL => Ok(Value::Null),
        MySqlValue::Int(i) => Ok(Value::Int(*i)),
        MySqlValue::UInt(u) => Ok(Value::Uint(*u)),
        // Widening the f32 bits would print 1.1 as 1.100000023841858.
        MySqlValue::Float(f) => f
            .to_string()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| DialectError::decode(&column.name, e.to_string())),
        MySqlValue::Double(d) => Ok(Value::Float(*d)),
        MySqlValue::Bytes(bytes) => match &column.data_type {
            DataType::Bytes => Ok(Value::Bytes(bytes.clone())),
            data_type => {
                let text = String::from_utf8(bytes.clone())
                    .map_err(|e| DialectError::decode(&column.name, e.to_string()))?;
                if data_type.is_temporal() {
                    Ok(Value::Temporal(text))
                } else {
                    Ok(Value::String(text))
                }
            }
        },
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            let date = format!("{year:04}-{month:02}-{day:02}");
            if column.data_type == DataType::Date {
                return Ok(Value::Temporal(date));
            }
            let mut text = format!("{date} {hour:02}:{minute:02}:{second:02}");
            if *micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            Ok(Value::Temporal(text))
        }
        MySqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
            let hours = u64::from(*days) * 24 + u64::from(*hours);
            let sign = if *negative { "-" } else { "" };
            let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if *micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            Ok(Value::Temporal(text))
        }
    }
}
