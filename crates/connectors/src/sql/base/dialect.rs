//! SQL text rendering for the supported source engines.

use crate::error::QueryBuildError;
use model::core::value::Value;

/// Upper bound MySQL accepts as "no limit" in `LIMIT offset, count`.
const MYSQL_UNBOUNDED_LIMIT: u64 = u64::MAX;

pub trait SqlDialect: Send + Sync {
    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> &'static str;

    /// Wraps a single identifier in the dialect's quotation marks, doubling
    /// any embedded quote character.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Renders a bound value as an inline SQL literal.
    fn quote_literal(&self, value: &Value) -> Result<String, QueryBuildError>;

    /// Renders the row-window clause, including its leading space, or an
    /// empty string when neither a limit nor an offset applies.
    fn limit_offset(&self, limit: Option<u64>, offset: u64) -> String;

    /// Renders the `ORDER BY` clause, including its leading space, that gives
    /// a key-less scan a repeatable row order so offsets stay meaningful.
    fn keyless_order_by(&self, select_list: &[String]) -> String {
        format!(" ORDER BY {}", select_list.join(", "))
    }

    /// Wraps an expression in a cast to the dialect's text type.
    fn cast_to_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS CHAR)")
    }

    /// Quotes a possibly schema-qualified table name part by part.
    fn quote_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn quote_literal(&self, value: &Value) -> Result<String, QueryBuildError> {
        match value {
            Value::String(s) | Value::Temporal(s) => {
                Ok(format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
            }
            Value::Bytes(bytes) => Ok(format!("X'{}'", hex(bytes))),
            other => numeric_literal(other),
        }
    }

    fn limit_offset(&self, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (None, 0) => String::new(),
            (Some(limit), 0) => format!(" LIMIT {limit}"),
            (None, offset) => format!(" LIMIT {offset}, {MYSQL_UNBOUNDED_LIMIT}"),
            (Some(limit), offset) => format!(" LIMIT {offset}, {limit}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', r#""""#))
    }

    fn quote_literal(&self, value: &Value) -> Result<String, QueryBuildError> {
        match value {
            Value::String(s) | Value::Temporal(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
            Value::Bytes(bytes) => Ok(format!("'\\x{}'::bytea", hex(bytes))),
            other => numeric_literal(other),
        }
    }

    /// Physical row order; stable while the table is not written to.
    fn keyless_order_by(&self, _select_list: &[String]) -> String {
        " ORDER BY ctid".to_string()
    }

    fn cast_to_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS text)")
    }

    fn limit_offset(&self, limit: Option<u64>, offset: u64) -> String {
        let mut clause = String::new();
        if let Some(limit) = limit {
            clause.push_str(&format!(" LIMIT {limit}"));
        }
        if offset > 0 {
            clause.push_str(&format!(" OFFSET {offset}"));
        }
        clause
    }
}

fn numeric_literal(value: &Value) -> Result<String, QueryBuildError> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Uint(u) => Ok(u.to_string()),
        Value::Float(f) if f.is_finite() => Ok(f.to_string()),
        other => Err(QueryBuildError::UnsupportedLiteral(other.to_string())),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_escape_their_quote_character() {
        assert_eq!(MySql.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(Postgres.quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn qualified_tables_are_quoted_per_part() {
        assert_eq!(Postgres.quote_table("public.orders"), r#""public"."orders""#);
        assert_eq!(MySql.quote_table("orders"), "`orders`");
    }

    #[test]
    fn string_literals_are_escaped() {
        let value = Value::String(r"it's a \ path".into());
        assert_eq!(MySql.quote_literal(&value).unwrap(), r"'it\'s a \\ path'");
        assert_eq!(Postgres.quote_literal(&value).unwrap(), r"'it''s a \ path'");
    }

    #[test]
    fn byte_literals_use_hex() {
        let value = Value::Bytes(vec![0x00, 0xab]);
        assert_eq!(MySql.quote_literal(&value).unwrap(), "X'00ab'");
        assert_eq!(Postgres.quote_literal(&value).unwrap(), r"'\x00ab'::bytea");
    }

    #[test]
    fn null_and_nan_are_not_literals() {
        assert!(MySql.quote_literal(&Value::Null).is_err());
        assert!(Postgres.quote_literal(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn mysql_limit_forms() {
        assert_eq!(MySql.limit_offset(None, 0), "");
        assert_eq!(MySql.limit_offset(Some(5), 0), " LIMIT 5");
        assert_eq!(MySql.limit_offset(Some(5), 10), " LIMIT 10, 5");
        assert_eq!(
            MySql.limit_offset(None, 10),
            " LIMIT 10, 18446744073709551615"
        );
    }

    #[test]
    fn keyless_order_per_dialect() {
        let select_list = vec!["`a`".to_string(), "`b`".to_string()];
        assert_eq!(MySql.keyless_order_by(&select_list), " ORDER BY `a`, `b`");
        assert_eq!(Postgres.keyless_order_by(&[]), " ORDER BY ctid");
        assert_eq!(Postgres.cast_to_text(r#""ip""#), r#"CAST("ip" AS text)"#);
    }

    #[test]
    fn postgres_limit_forms() {
        assert_eq!(Postgres.limit_offset(None, 0), "");
        assert_eq!(Postgres.limit_offset(Some(5), 0), " LIMIT 5");
        assert_eq!(Postgres.limit_offset(None, 10), " OFFSET 10");
        assert_eq!(Postgres.limit_offset(Some(5), 10), " LIMIT 5 OFFSET 10");
    }
}
