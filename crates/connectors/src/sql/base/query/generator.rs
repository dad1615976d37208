use crate::{error::QueryBuildError, sql::base::dialect::SqlDialect};
use model::{execution::dump_task::DumpTaskConfig, pagination::position::Position};
use std::cmp::Ordering;
use tracing::debug;

/// The single statement a dump task runs, plus what the engine needs to
/// derive a position from each returned row.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpQuery {
    pub sql: String,
    /// Projected column names, in select-list order.
    pub columns: Vec<String>,
    /// Index of the unique key in the select list. Equal to `columns.len()`
    /// when the key is selected only to track positions.
    pub key_index: Option<usize>,
    /// Offset position of the first row for key-less tables.
    pub first_offset: u64,
    select_list: Vec<String>,
    /// Everything after the select list, starting at `FROM`.
    tail: String,
}

impl DumpQuery {
    /// Builds the projection query for `config` in `dialect`.
    ///
    /// Keyed tables read `[lower, upper)` past `resume_after`, ordered by
    /// the key ascending. Key-less tables read the same window expressed as
    /// row offsets.
    pub fn build(config: &DumpTaskConfig, dialect: &dyn SqlDialect) -> Result<Self, QueryBuildError> {
        config.validate()?;

        let query = match &config.unique_key {
            Some(key) => Self::keyed(config, key, dialect)?,
            None => Self::offset(config, dialect),
        };

        debug!(table = %config.table, dialect = dialect.name(), sql = %query.sql, "Built dump query");
        Ok(query)
    }

    /// Renders the same statement with the select-list entries at `indexes`
    /// cast to text, keeping their output names.
    pub fn with_text_columns(&self, dialect: &dyn SqlDialect, indexes: &[usize]) -> String {
        let select_list = self
            .select_list
            .iter()
            .enumerate()
            .map(|(index, column)| {
                if indexes.contains(&index) {
                    format!("{} AS {column}", dialect.cast_to_text(column))
                } else {
                    column.clone()
                }
            })
            .collect::<Vec<_>>();
        assemble(&select_list, &self.tail)
    }

    fn keyed(config: &DumpTaskConfig, key: &str, dialect: &dyn SqlDialect) -> Result<Self, QueryBuildError> {
        let mut select_list: Vec<String> = config
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();

        let key_index = match config.columns.iter().position(|c| c.eq_ignore_ascii_case(key)) {
            Some(index) => index,
            None => {
                select_list.push(dialect.quote_identifier(key));
                config.columns.len()
            }
        };

        let quoted_key = dialect.quote_identifier(key);
        let mut conditions = Vec::new();

        let lower_superseded = match (&config.lower_bound, &config.resume_after) {
            (Some(lower), Some(resume)) => {
                matches!(resume.intrinsic_cmp(lower), Some(Ordering::Greater | Ordering::Equal))
            }
            _ => false,
        };

        if let Some(Position::Key(lower)) = &config.lower_bound
            && !lower_superseded
        {
            conditions.push(format!("{quoted_key} >= {}", dialect.quote_literal(lower)?));
        }
        if let Some(Position::Key(resume)) = &config.resume_after {
            conditions.push(format!("{quoted_key} > {}", dialect.quote_literal(resume)?));
        }
        if let Some(Position::Key(upper)) = &config.upper_bound {
            conditions.push(format!("{quoted_key} < {}", dialect.quote_literal(upper)?));
        }

        let quoted_table = dialect.quote_table(&config.table);
        let mut tail = format!("FROM {quoted_table}");
        if !conditions.is_empty() {
            tail.push_str(" WHERE ");
            tail.push_str(&conditions.join(" AND "));
        }
        // Qualified so a text-cast output column of the same name never
        // takes over the sort.
        tail.push_str(&format!(" ORDER BY {quoted_table}.{quoted_key} ASC"));

        Ok(DumpQuery {
            sql: assemble(&select_list, &tail),
            columns: config.columns.clone(),
            key_index: Some(key_index),
            first_offset: 0,
            select_list,
            tail,
        })
    }

    fn offset(config: &DumpTaskConfig, dialect: &dyn SqlDialect) -> Self {
        let lower = config.lower_bound.as_ref().and_then(Position::as_offset).unwrap_or(0);
        let after_resume = config
            .resume_after
            .as_ref()
            .and_then(Position::as_offset)
            .map(|resume| resume.saturating_add(1))
            .unwrap_or(0);
        let start = lower.max(after_resume);
        let limit = config
            .upper_bound
            .as_ref()
            .and_then(Position::as_offset)
            .map(|upper| upper.saturating_sub(start));

        let select_list: Vec<String> = config
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let tail = format!(
            "FROM {}{}{}",
            dialect.quote_table(&config.table),
            dialect.keyless_order_by(&select_list),
            dialect.limit_offset(limit, start)
        );

        DumpQuery {
            sql: assemble(&select_list, &tail),
            columns: config.columns.clone(),
            key_index: None,
            first_offset: start,
            select_list,
            tail,
        }
    }
}

fn assemble(select_list: &[String], tail: &str) -> String {
    format!("SELECT {} {tail}", select_list.join(", "))
}
