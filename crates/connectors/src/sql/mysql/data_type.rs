use model::core::data_type::{ColumnInfo, DataType};
use mysql_async::{
    Column,
    consts::{ColumnFlags, ColumnType},
};

/// Collation id MySQL reports for binary strings and blobs.
const BINARY_CHARSET: u16 = 63;

pub trait MySqlColumnDataType {
    fn from_mysql_column(column: &Column) -> DataType;
}

impl MySqlColumnDataType for DataType {
    fn from_mysql_column(column: &Column) -> DataType {
        let flags = column.flags();
        let binary = column.character_set() == BINARY_CHARSET;

        match column.column_type() {
            ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_INT24
            | ColumnType::MYSQL_TYPE_LONG
            | ColumnType::MYSQL_TYPE_LONGLONG => {
                if flags.contains(ColumnFlags::UNSIGNED_FLAG) {
                    DataType::IntUnsigned
                } else {
                    DataType::Int
                }
            }
            ColumnType::MYSQL_TYPE_YEAR => DataType::Year,
            ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => DataType::Float,
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => DataType::Decimal,
            ColumnType::MYSQL_TYPE_ENUM | ColumnType::MYSQL_TYPE_SET => DataType::Enum,
            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_BLOB => {
                // ENUM and SET travel as strings with a flag attached
                if flags.intersects(ColumnFlags::ENUM_FLAG | ColumnFlags::SET_FLAG) {
                    DataType::Enum
                } else if binary {
                    DataType::Bytes
                } else {
                    DataType::String
                }
            }
            ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => DataType::Bytes,
            ColumnType::MYSQL_TYPE_JSON => DataType::Json,
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => DataType::Date,
            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => DataType::Time,
            ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2 => DataType::Timestamp,
            other => DataType::Other(format!("{other:?}")),
        }
    }
}

pub(crate) fn column_info(column: &Column) -> ColumnInfo {
    ColumnInfo::new(
        column.name_str().into_owned(),
        DataType::from_mysql_column(column),
        format!("{:?}", column.column_type()),
    )
}
