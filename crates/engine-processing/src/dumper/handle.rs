use crate::dumper::control::DumpControl;
use engine_core::{metrics::MetricsSnapshot, progress::DumpProgress};
use model::{execution::state::DumpState, pagination::position::Position};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Orchestrator-side control of one dump task.
///
/// Cheap to clone. Every method is non-blocking except [`DumpHandle::wait`];
/// control requests take effect at the next row boundary.
#[derive(Debug, Clone)]
pub struct DumpHandle {
    control: Arc<DumpControl>,
}

impl DumpHandle {
    pub(crate) fn new(control: Arc<DumpControl>) -> Self {
        Self { control }
    }

    /// Suspends row pulls without closing the cursor. Only a running dump
    /// can be paused; returns whether the request took effect.
    pub fn pause(&self) -> bool {
        if self.control.transition(DumpState::Running, DumpState::Paused) {
            self.control.metrics.increment_pauses();
            info!(table = %self.control.table, "Dump paused");
            true
        } else {
            warn!(table = %self.control.table, state = %self.state(), "Ignoring pause request");
            false
        }
    }

    pub fn resume(&self) -> bool {
        if self.control.transition(DumpState::Paused, DumpState::Running) {
            info!(table = %self.control.table, "Dump resumed");
            true
        } else {
            warn!(table = %self.control.table, state = %self.state(), "Ignoring resume request");
            false
        }
    }

    /// Requests cancellation. Idempotent, and a no-op once the dump has
    /// reached a terminal state.
    pub fn stop(&self) -> bool {
        let requested = self.control.state.send_if_modified(|state| {
            if state.is_terminal() || *state == DumpState::Stopping {
                false
            } else {
                *state = DumpState::Stopping;
                true
            }
        });

        if requested {
            info!(table = %self.control.table, "Stop requested");
            self.control.cancel.cancel();
        }
        requested
    }

    pub fn state(&self) -> DumpState {
        self.control.current()
    }

    /// Position of the last record pushed to the channel.
    pub fn last_position(&self) -> Option<Position> {
        self.control.position.borrow().clone()
    }

    /// Receiver notified each time a record is emitted, for checkpointing
    /// without polling.
    pub fn position_updates(&self) -> watch::Receiver<Option<Position>> {
        self.control.position.subscribe()
    }

    pub fn state_updates(&self) -> watch::Receiver<DumpState> {
        self.control.state.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.control.metrics.snapshot()
    }

    pub fn progress(&self) -> DumpProgress {
        let metrics = self.metrics();
        let timestamps = *self.control.timestamps();
        DumpProgress {
            table: self.control.table.clone(),
            state: self.state(),
            last_position: self.last_position(),
            records_emitted: metrics.records_emitted,
            bytes_emitted: metrics.bytes_emitted,
            started_at: timestamps.started_at,
            finished_at: timestamps.finished_at,
        }
    }

    /// Waits until the dump reaches a terminal state.
    pub async fn wait(&self) -> DumpState {
        let mut state = self.state_updates();
        match state.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }
}
