use crate::{
    core::value::{FieldValue, Value},
    execution::errors::FailureCause,
    pagination::position::Position,
};
use serde::{Deserialize, Serialize};

/// One dumped row in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub values: Vec<FieldValue>,
    pub position: Position,
    /// Strictly increasing, gap-free within one dump task; starts at 1.
    pub sequence: u64,
}

impl Record {
    pub fn new(values: Vec<FieldValue>, position: Position, sequence: u64) -> Self {
        Self {
            values,
            position,
            sequence,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn size_bytes(&self) -> usize {
        self.values
            .iter()
            .map(|f| f.name.len() + f.value.size_bytes())
            .sum()
    }
}

/// Item carried by the record channel: a record or a terminal control marker.
///
/// Exactly one terminal marker ends the stream of a task and nothing follows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamItem {
    Record(Record),
    /// Every row of the task's range has been delivered.
    Finished,
    /// The task aborted; rows up to the last emitted position were delivered.
    Failed(FailureCause),
    /// The task was stopped on request before exhausting its range.
    Cancelled,
}

impl StreamItem {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamItem::Record(_))
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            StreamItem::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            StreamItem::Record(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::errors::FailureKind;

    #[test]
    fn only_records_are_non_terminal() {
        let record = Record::new(vec![], Position::Offset(0), 1);
        assert!(!StreamItem::Record(record).is_terminal());
        assert!(StreamItem::Finished.is_terminal());
        assert!(StreamItem::Cancelled.is_terminal());
        assert!(StreamItem::Failed(FailureCause::new(FailureKind::RowDecode, "bad")).is_terminal());
    }

    #[test]
    fn serializes_markers_with_tag() {
        let json = serde_json::to_string(&StreamItem::Finished).unwrap();
        assert_eq!(json, r#"{"type":"finished"}"#);
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let record = Record::new(
            vec![FieldValue::new("Id", Value::Int(4))],
            Position::key(4i64),
            1,
        );
        assert_eq!(record.get_value("id"), Value::Int(4));
        assert_eq!(record.get_value("missing"), Value::Null);
    }
}
