use crate::error::CliError;
use model::{
    core::value::Value,
    pagination::position::Position,
    records::record::{Record, StreamItem},
};
use serde_json::{Map, Value as JsonValue, json};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Writes stream items as JSON lines, one object per item.
pub struct RecordWriter {
    out: BufWriter<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl RecordWriter {
    pub async fn open(path: Option<&str>) -> Result<Self, CliError> {
        let out: Box<dyn AsyncWrite + Send + Unpin> = match path {
            Some(path) => Box::new(
                tokio::fs::File::create(path)
                    .await
                    .map_err(CliError::Output)?,
            ),
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Self {
            out: BufWriter::new(out),
        })
    }

    pub async fn write(&mut self, item: &StreamItem) -> Result<(), CliError> {
        let mut line = serde_json::to_vec(&item_json(item)).map_err(CliError::JsonSerialize)?;
        line.push(b'\n');
        self.out.write_all(&line).await.map_err(CliError::Output)
    }

    pub async fn flush(&mut self) -> Result<(), CliError> {
        self.out.flush().await.map_err(CliError::Output)
    }
}

pub fn item_json(item: &StreamItem) -> JsonValue {
    match item {
        StreamItem::Record(record) => record_json(record),
        StreamItem::Finished => json!({ "type": "finished" }),
        StreamItem::Cancelled => json!({ "type": "cancelled" }),
        StreamItem::Failed(cause) => json!({
            "type": "failed",
            "kind": cause.kind,
            "message": cause.message,
        }),
    }
}

fn record_json(record: &Record) -> JsonValue {
    let values: Map<String, JsonValue> = record
        .values
        .iter()
        .map(|field| (field.name.clone(), value_json(&field.value)))
        .collect();

    let position = match &record.position {
        Position::Key(key) => json!({ "key": value_json(key) }),
        Position::Offset(offset) => json!({ "offset": offset }),
    };

    json!({
        "type": "record",
        "sequence": record.sequence,
        "position": position,
        "values": values,
    })
}

// Bytes go out as 0x-prefixed hex; non-finite floats as their text.
fn value_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Int(v) => json!(v),
        Value::Uint(v) => json!(v),
        Value::Float(v) if v.is_finite() => json!(v),
        Value::String(s) | Value::Temporal(s) => json!(s),
        other => JsonValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::value::FieldValue,
        execution::errors::{FailureCause, FailureKind},
    };

    #[test]
    fn renders_records_as_flat_objects() {
        let record = Record::new(
            vec![
                FieldValue::new("id", Value::Int(3)),
                FieldValue::new("blob", Value::Bytes(vec![0xde, 0xad])),
                FieldValue::new("created", Value::Temporal("2024-01-02".into())),
                FieldValue::new("note", Value::Null),
            ],
            Position::key(3i64),
            7,
        );

        let json = item_json(&StreamItem::Record(record));
        assert_eq!(json["type"], "record");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["position"]["key"], 3);
        assert_eq!(json["values"]["blob"], "0xdead");
        assert_eq!(json["values"]["created"], "2024-01-02");
        assert!(json["values"]["note"].is_null());
    }

    #[test]
    fn renders_failure_markers_with_kind() {
        let item = StreamItem::Failed(FailureCause::new(FailureKind::RowDecode, "bad utf-8"));
        let json = item_json(&item);
        assert_eq!(json["type"], "failed");
        assert_eq!(json["kind"], "row_decode");
        assert_eq!(json["message"], "bad utf-8");
    }

    #[test]
    fn offsets_and_nan_render_as_json() {
        let record = Record::new(
            vec![FieldValue::new("ratio", Value::Float(f64::NAN))],
            Position::Offset(12),
            1,
        );
        let json = item_json(&StreamItem::Record(record));
        assert_eq!(json["position"]["offset"], 12);
        assert_eq!(json["values"]["ratio"], "NaN");
    }
}
