use chrono::{DateTime, Utc};
use model::{execution::state::DumpState, pagination::position::Position};
use serde::Serialize;

/// Point-in-time view of a dump task, for checkpointing and status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpProgress {
    pub table: String,
    pub state: DumpState,
    /// Position of the last record pushed to the channel.
    pub last_position: Option<Position>,
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DumpProgress {
    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_position_and_state() {
        let progress = DumpProgress {
            table: "orders".to_string(),
            state: DumpState::Running,
            last_position: Some(Position::key(42i64)),
            records_emitted: 42,
            bytes_emitted: 336,
            started_at: None,
            finished_at: None,
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["records_emitted"], 42);
        assert_eq!(json["last_position"]["Key"]["Int"], 42);
        assert!(!progress.is_done());
    }
}
