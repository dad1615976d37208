use crate::error::DumpError;
use chrono::{DateTime, Utc};
use engine_core::metrics::DumpMetrics;
use model::{execution::state::DumpState, pagination::position::Position};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Timestamps {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// State shared between a running dumper and its handles.
#[derive(Debug)]
pub(crate) struct DumpControl {
    pub table: String,
    pub state: watch::Sender<DumpState>,
    pub position: watch::Sender<Option<Position>>,
    pub cancel: CancellationToken,
    pub metrics: DumpMetrics,
    timestamps: Mutex<Timestamps>,
}

impl DumpControl {
    pub fn new(table: String) -> Self {
        Self {
            table,
            state: watch::Sender::new(DumpState::Created),
            position: watch::Sender::new(None),
            cancel: CancellationToken::new(),
            metrics: DumpMetrics::new(),
            timestamps: Mutex::new(Timestamps::default()),
        }
    }

    pub fn current(&self) -> DumpState {
        *self.state.borrow()
    }

    /// Applies `from -> to` if the engine is currently in `from`.
    pub fn transition(&self, from: DumpState, to: DumpState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    pub fn mark_started(&self) {
        self.timestamps().started_at = Some(Utc::now());
        self.transition(DumpState::Created, DumpState::Running);
    }

    pub fn mark_finished(&self, state: DumpState) {
        self.timestamps().finished_at = Some(Utc::now());
        self.state.send_replace(state);
    }

    pub fn record_emitted(&self, position: Position, bytes: usize) {
        self.metrics.record_emitted(bytes as u64);
        self.position.send_replace(Some(position));
    }

    pub fn timestamps(&self) -> std::sync::MutexGuard<'_, Timestamps> {
        self.timestamps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Row-boundary check: returns once the dump may pull the next row.
    ///
    /// Fails with [`DumpError::Cancelled`] if a stop was requested, and
    /// parks while the dump is paused.
    pub async fn checkpoint(&self) -> Result<(), DumpError> {
        if self.cancel.is_cancelled() {
            return Err(DumpError::Cancelled);
        }

        let mut state = self.state.subscribe();
        loop {
            if *state.borrow_and_update() != DumpState::Paused {
                return Ok(());
            }

            debug!(table = %self.table, "Dump paused at row boundary");
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DumpError::Cancelled),
                changed = state.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
