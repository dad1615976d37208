use model::core::data_type::{ColumnInfo, DataType};
use tokio_postgres::{
    Column,
    types::{FromSql, Kind, Type},
};

pub trait PgDataType {
    fn from_pg_type(ty: &Type) -> DataType;
}

impl PgDataType for DataType {
    fn from_pg_type(ty: &Type) -> DataType {
        if let Kind::Enum(_) = ty.kind() {
            return DataType::Enum;
        }

        match ty.name() {
            "bool" => DataType::Boolean,
            "int2" | "int4" | "int8" => DataType::Int,
            "oid" => DataType::IntUnsigned,
            "float4" | "float8" => DataType::Float,
            "numeric" => DataType::Decimal,
            "text" | "varchar" | "bpchar" | "name" | "citext" => DataType::String,
            "bytea" => DataType::Bytes,
            "json" | "jsonb" => DataType::Json,
            "uuid" => DataType::Uuid,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "timetz" => DataType::TimeTz,
            "timestamp" => DataType::Timestamp,
            "timestamptz" => DataType::TimestampTz,
            "interval" => DataType::Interval,
            other => DataType::Other(other.to_string()),
        }
    }
}

/// Whether a result column has no binary decoder and must be selected as
/// text instead: arrays, network and geometric types, ranges, composites.
pub(crate) fn needs_text_cast(ty: &Type) -> bool {
    matches!(DataType::from_pg_type(ty), DataType::Other(_)) && !<String as FromSql>::accepts(ty)
}

pub(crate) fn column_info(column: &Column) -> ColumnInfo {
    ColumnInfo::new(
        column.name(),
        DataType::from_pg_type(column.type_()),
        column.type_().name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_builtin_types() {
        assert_eq!(DataType::from_pg_type(&Type::INT8), DataType::Int);
        assert_eq!(DataType::from_pg_type(&Type::OID), DataType::IntUnsigned);
        assert_eq!(DataType::from_pg_type(&Type::BPCHAR), DataType::String);
        assert_eq!(DataType::from_pg_type(&Type::JSONB), DataType::Json);
        assert_eq!(DataType::from_pg_type(&Type::TIMESTAMPTZ), DataType::TimestampTz);
        assert_eq!(
            DataType::from_pg_type(&Type::INET),
            DataType::Other("inet".to_string())
        );
        assert_eq!(DataType::from_pg_type(&Type::INTERVAL), DataType::Interval);
    }

    #[test]
    fn undecodable_types_are_cast_to_text() {
        for ty in [Type::INET, Type::INT4_ARRAY, Type::MONEY, Type::XML, Type::BIT, Type::POINT] {
            assert!(needs_text_cast(&ty), "{ty}");
        }
        for ty in [Type::TEXT, Type::NUMERIC, Type::INTERVAL, Type::JSONB, Type::UNKNOWN] {
            assert!(!needs_text_cast(&ty), "{ty}");
        }
    }

    #[test]
    fn enum_kind_wins_over_name() {
        let mood = Type::new(
            "mood".to_string(),
            16_384,
            Kind::Enum(vec!["sad".to_string(), "happy".to_string()]),
            "public".to_string(),
        );
        assert_eq!(DataType::from_pg_type(&mood), DataType::Enum);
    }
}
