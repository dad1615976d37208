use crate::{
    error::DialectError,
    source::{config::ConnectionParams, lease::Connection},
    sql::{
        base::{
            cursor::RowCursor,
            dialect::{Postgres, SqlDialect},
            query::generator::DumpQuery,
            row::CursorRow,
            strategy::DialectStrategy,
        },
        postgres::{
            cursor::PgCursor,
            data_type::{column_info, needs_text_cast},
            temporal::{PgEnumLabel, PgTemporalText},
            text::{PgJsonText, PgNumericText},
        },
    },
};
use async_trait::async_trait;
use model::core::{
    data_type::{ColumnInfo, DataType},
    identifiers::SourceDialect,
    value::Value,
};
use tokio_postgres::{Client, IsolationLevel, Row, types::FromSql};
use tracing::debug;

pub const APPLICATION_NAME: &str = "inventory-dumper";

/// PostgreSQL capabilities.
///
/// The extended query protocol only streams when the portal is executed with
/// a bounded, positive row count, so the cursor binds a portal and pulls
/// `batch_size` rows per round trip inside a repeatable-read snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgStrategy;

#[async_trait]
impl DialectStrategy for PgStrategy {
    fn kind(&self) -> SourceDialect {
        SourceDialect::Postgres
    }

    fn sql(&self) -> &dyn SqlDialect {
        &Postgres
    }

    fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::from([("application_name".to_string(), APPLICATION_NAME.to_string())])
    }

    async fn open_cursor<'c>(
        &self,
        conn: &'c mut dyn Connection,
        query: &DumpQuery,
        batch_size_hint: usize,
    ) -> Result<Box<dyn RowCursor + 'c>, DialectError> {
        let client = conn
            .as_any_mut()
            .downcast_mut::<Client>()
            .ok_or(DialectError::ConnectionMismatch("PostgreSQL"))?;

        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await?;

        let mut statement = tx.prepare(&query.sql).await?;
        let casts = statement
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| needs_text_cast(column.type_()))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if !casts.is_empty() {
            debug!(columns = ?casts, "Selecting columns without a binary decoder as text");
            statement = tx.prepare(&query.with_text_columns(&Postgres, &casts)).await?;
        }
        let columns = statement
            .columns()
            .iter()
            .map(column_info)
            .collect::<Vec<_>>();
        let portal = tx.bind(&statement, &[]).await?;

        let fetch_size = i32::try_from(batch_size_hint).unwrap_or(i32::MAX).max(1);
        debug!(fetch_size, "Opened PostgreSQL portal");

        Ok(Box::new(PgCursor::new(tx, portal, columns, fetch_size)))
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
            .ok_or(DialectError::RowMismatch("PostgreSQL"))?;
        if index >= row.len() {
            return Err(DialectError::ColumnOutOfRange(index));
        }
        decode_pg_value(row, index, column)
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, index: usize, column: &ColumnInfo) -> Result<Option<T>, DialectError> {
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| DialectError::decode(&column.name, e.to_string()))
}

fn decode_pg_value(row: &Row, index: usize, column: &ColumnInfo) -> Result<Value, DialectError> {
    let value = match &column.data_type {
        DataType::Boolean => get::<bool>(row, index, column)?.map(|b| Value::Int(i64::from(b))),
        DataType::IntUnsigned => get::<u32>(row, index, column)?.map(|v| Value::Uint(u64::from(v))),
        DataType::Int => match column.native_type.as_str() {
            "int2" => get::<i16>(row, index, column)?.map(|v| Value::Int(i64::from(v))),
            "int4" => get::<i32>(row, index, column)?.map(|v| Value::Int(i64::from(v))),
            _ => get::<i64>(row, index, column)?.map(Value::Int),
        },
        DataType::Float => match column.native_type.as_str() {
            "float4" => get::<f32>(row, index, column)?.map(|v| Value::Float(f64::from(v))),
            _ => get::<f64>(row, index, column)?.map(Value::Float),
        },
        DataType::Decimal => get::<PgNumericText>(row, index, column)?.map(|n| Value::String(n.0)),
        DataType::Json => get::<PgJsonText>(row, index, column)?.map(|j| Value::String(j.0)),
        DataType::Uuid => get::<uuid::Uuid>(row, index, column)?.map(|u| Value::String(u.to_string())),
        DataType::Bytes => get::<Vec<u8>>(row, index, column)?.map(Value::Bytes),
        DataType::Enum => get::<PgEnumLabel>(row, index, column)?.map(|l| Value::String(l.0)),
        data_type if data_type.is_temporal() => {
            get::<PgTemporalText>(row, index, column)?.map(|t| Value::Temporal(t.0))
        }
        _ => match row.try_get::<_, Option<String>>(index) {
            Ok(text) => text.map(Value::String),
            Err(_) => {
                return Err(DialectError::UnsupportedType {
                    column: column.name.clone(),
                    native: column.native_type.clone(),
                });
            }
        },
    };

    Ok(value.unwrap_or(Value::Null))
}
