use crate::{
    core::{
        identifiers::{SourceDialect, SourceRef},
        value::Value,
    },
    execution::errors::ConfigError,
    pagination::position::Position,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashSet};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Everything one inventory dump task needs to know about its slice of a
/// table. Immutable once handed to a dumper.
///
/// The task covers `[lower_bound, upper_bound)` on `unique_key`, further
/// restricted to positions strictly after `resume_after` when a previous run
/// of the same slice already delivered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpTaskConfig {
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique_key: Option<String>,
    #[serde(default)]
    pub lower_bound: Option<Position>,
    #[serde(default)]
    pub upper_bound: Option<Position>,
    #[serde(default)]
    pub resume_after: Option<Position>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub dialect: SourceDialect,
    pub source: SourceRef,
}

impl DumpTaskConfig {
    pub fn builder(table: impl Into<String>, dialect: SourceDialect, source: SourceRef) -> DumpTaskConfigBuilder {
        DumpTaskConfigBuilder::new(table.into(), dialect, source)
    }

    /// Configuration for restarting this slice after `last_emitted`.
    pub fn resume_from(&self, last_emitted: Position) -> Self {
        let resume_after = match &self.resume_after {
            Some(current) if current.intrinsic_cmp(&last_emitted) == Some(Ordering::Greater) => {
                current.clone()
            }
            _ => last_emitted,
        };

        DumpTaskConfig {
            resume_after: Some(resume_after),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        if self.columns.is_empty() {
            return Err(ConfigError::NoColumns(self.table.clone()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateColumn(column.clone()));
            }
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        let bounds = [
            ("lower", &self.lower_bound),
            ("upper", &self.upper_bound),
            ("resume", &self.resume_after),
        ];
        for (name, bound) in bounds {
            match (bound, self.unique_key.is_some()) {
                (Some(Position::Key(Value::Null)), _) => return Err(ConfigError::NullBound(name)),
                (Some(Position::Key(_)), false) => {
                    return Err(ConfigError::KeyBoundWithoutKey(name));
                }
                (Some(Position::Offset(_)), true) => {
                    return Err(ConfigError::OffsetBoundWithKey(name));
                }
                _ => {}
            }
        }

        if let (Some(lower), Some(upper)) = (&self.lower_bound, &self.upper_bound) {
            if lower.compare(upper).is_none() {
                return Err(ConfigError::IncomparableBounds {
                    lower: lower.to_string(),
                    upper: upper.to_string(),
                });
            }
            // Text and temporal keys follow the column's collation, which only
            // the source engine knows; an inverted range of those reads nothing.
            if lower.intrinsic_cmp(upper) == Some(Ordering::Greater) {
                return Err(ConfigError::InvertedRange {
                    lower: lower.to_string(),
                    upper: upper.to_string(),
                });
            }
        }

        if let Some(resume) = &self.resume_after {
            for bound in [&self.lower_bound, &self.upper_bound].into_iter().flatten() {
                if resume.compare(bound).is_none() {
                    return Err(ConfigError::IncomparableBounds {
                        lower: resume.to_string(),
                        upper: bound.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether `position` lies inside the slice this task is allowed to read.
    pub fn contains(&self, position: &Position) -> bool {
        let at_or_after_lower = self
            .lower_bound
            .as_ref()
            .is_none_or(|lower| matches!(position.compare(lower), Some(Ordering::Greater | Ordering::Equal)));
        let after_resume = self
            .resume_after
            .as_ref()
            .is_none_or(|resume| position.compare(resume) == Some(Ordering::Greater));
        let before_upper = self
            .upper_bound
            .as_ref()
            .is_none_or(|upper| position.compare(upper) == Some(Ordering::Less));

        at_or_after_lower && after_resume && before_upper
    }
}

pub struct DumpTaskConfigBuilder {
    table: String,
    columns: Vec<String>,
    unique_key: Option<String>,
    lower_bound: Option<Position>,
    upper_bound: Option<Position>,
    resume_after: Option<Position>,
    batch_size: usize,
    dialect: SourceDialect,
    source: SourceRef,
}

impl DumpTaskConfigBuilder {
    pub fn new(table: String, dialect: SourceDialect, source: SourceRef) -> Self {
        DumpTaskConfigBuilder {
            table,
            columns: Vec::new(),
            unique_key: None,
            lower_bound: None,
            upper_bound: None,
            resume_after: None,
            batch_size: DEFAULT_BATCH_SIZE,
            dialect,
            source,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn unique_key(mut self, column: impl Into<String>) -> Self {
        self.unique_key = Some(column.into());
        self
    }

    pub fn lower_bound(mut self, position: Position) -> Self {
        self.lower_bound = Some(position);
        self
    }

    pub fn upper_bound(mut self, position: Position) -> Self {
        self.upper_bound = Some(position);
        self
    }

    pub fn resume_after(mut self, position: Position) -> Self {
        self.resume_after = Some(position);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn build(self) -> DumpTaskConfig {
        DumpTaskConfig {
            table: self.table,
            columns: self.columns,
            unique_key: self.unique_key,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            resume_after: self.resume_after,
            batch_size: self.batch_size,
            dialect: self.dialect,
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> DumpTaskConfigBuilder {
        DumpTaskConfig::builder("t", SourceDialect::MySql, SourceRef::from("src"))
            .columns(["id", "name"])
            .unique_key("id")
    }

    #[test]
    fn accepts_valid_split() {
        let config = keyed()
            .lower_bound(Position::key(5i64))
            .upper_bound(Position::key(8i64))
            .build();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_inverted_range() {
        let config = keyed()
            .lower_bound(Position::key(9i64))
            .upper_bound(Position::key(8i64))
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn collated_key_bounds_are_left_to_the_source() {
        // "apple" < "Banana" under a case-insensitive collation, though not bytewise.
        let config = DumpTaskConfig::builder("t", SourceDialect::MySql, SourceRef::from("src"))
            .columns(["name"])
            .unique_key("name")
            .lower_bound(Position::key("apple"))
            .upper_bound(Position::key("Banana"))
            .build();
        assert_eq!(config.validate(), Ok(()));

        let config = keyed()
            .lower_bound(Position::key(8.5))
            .upper_bound(Position::key(8i64))
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn resume_takes_the_latest_emitted_text_key() {
        let config = DumpTaskConfig::builder("t", SourceDialect::MySql, SourceRef::from("src"))
            .columns(["name"])
            .unique_key("name")
            .resume_after(Position::key("apple"))
            .build();
        let resumed = config.resume_from(Position::key("Banana"));
        assert_eq!(resumed.resume_after, Some(Position::key("Banana")));
    }

    #[test]
    fn rejects_key_bound_on_keyless_table() {
        let config = DumpTaskConfig::builder("t", SourceDialect::Postgres, SourceRef::from("src"))
            .columns(["a"])
            .lower_bound(Position::key(1i64))
            .build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::KeyBoundWithoutKey("lower"))
        );
    }

    #[test]
    fn rejects_duplicate_projection_and_zero_batch() {
        let config = keyed().columns(["id", "ID"]).build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateColumn("ID".to_string()))
        );

        let config = keyed().batch_size(0).build();
        assert_eq!(config.validate(), Err(ConfigError::InvalidBatchSize));
    }

    #[test]
    fn resume_excludes_last_emitted_position() {
        let config = keyed()
            .lower_bound(Position::key(5i64))
            .upper_bound(Position::key(8i64))
            .build();
        let resumed = config.resume_from(Position::key(6i64));

        assert!(!resumed.contains(&Position::key(5i64)));
        assert!(!resumed.contains(&Position::key(6i64)));
        assert!(resumed.contains(&Position::key(7i64)));
        assert!(!resumed.contains(&Position::key(8i64)));
    }

    #[test]
    fn resume_never_moves_backwards() {
        let config = keyed().resume_after(Position::key(10i64)).build();
        let resumed = config.resume_from(Position::key(4i64));
        assert_eq!(resumed.resume_after, Some(Position::key(10i64)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "table": "orders",
            "columns": ["id", "total"],
            "unique_key": "id",
            "lower_bound": {"Key": {"Int": 100}},
            "dialect": "postgres",
            "source": "orders-db"
        }"#;
        let config: DumpTaskConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.lower_bound, Some(Position::key(100i64)));
        assert_eq!(config.upper_bound, None);
    }
}
