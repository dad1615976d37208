use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one dump engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DumpState {
    Created,
    Running,
    Paused,
    Stopping,
    Finished,
    Failed,
    /// Terminal state after a stop request was honoured.
    Stopped,
}

impl DumpState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DumpState::Finished | DumpState::Failed | DumpState::Stopped
        )
    }
}

impl fmt::Display for DumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DumpState::Created => "CREATED",
            DumpState::Running => "RUNNING",
            DumpState::Paused => "PAUSED",
            DumpState::Stopping => "STOPPING",
            DumpState::Finished => "FINISHED",
            DumpState::Failed => "FAILED",
            DumpState::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}
