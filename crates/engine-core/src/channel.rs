//! Bounded single-producer, single-consumer stream of dump records.
//!
//! Records and the terminal marker share one ordered channel, so the
//! consumer learns about the end of the stream in band. `push` waits while
//! the channel is full and `pop` waits while it is empty.

use crate::error::ChannelError;
use model::records::record::StreamItem;
use tokio::sync::mpsc;
use tracing::debug;

/// Creates a channel holding up to `capacity` items in flight.
pub fn record_channel(capacity: usize) -> (RecordSender, RecordReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (
        RecordSender {
            tx,
            capacity,
            terminated: false,
        },
        RecordReceiver { rx, done: false },
    )
}

/// Producing half. Deliberately not `Clone`: a task has exactly one producer.
#[derive(Debug)]
pub struct RecordSender {
    tx: mpsc::Sender<StreamItem>,
    capacity: usize,
    terminated: bool,
}

impl RecordSender {
    /// Pushes `item`, waiting for room when the channel is full.
    ///
    /// Nothing may follow a terminal marker; such pushes are rejected.
    pub async fn push(&mut self, item: StreamItem) -> Result<(), ChannelError> {
        if self.terminated {
            return Err(ChannelError::AfterTerminal);
        }

        let terminal = item.is_terminal();
        self.tx.send(item).await.map_err(|_| ChannelError::Closed)?;
        if terminal {
            self.terminated = true;
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a terminal marker has already been pushed.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half.
#[derive(Debug)]
pub struct RecordReceiver {
    rx: mpsc::Receiver<StreamItem>,
    done: bool,
}

impl RecordReceiver {
    /// Next item in emission order. Returns `None` once the terminal marker
    /// has been handed out, or when the producer vanished without one.
    pub async fn pop(&mut self) -> Option<StreamItem> {
        if self.done {
            return None;
        }

        let item = self.rx.recv().await;
        match &item {
            Some(item) if item.is_terminal() => self.done = true,
            Some(_) => {}
            None => {
                debug!("Record channel producer dropped without a terminal marker");
                self.done = true;
            }
        }
        item
    }

    /// Closes the channel. A producer blocked in `push` is woken with
    /// [`ChannelError::Closed`].
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::value::{FieldValue, Value},
        execution::errors::{FailureCause, FailureKind},
        pagination::position::Position,
        records::record::Record,
    };
    use std::time::Duration;
    use tokio::time::timeout;

    fn record(seq: u64) -> StreamItem {
        StreamItem::Record(Record::new(
            vec![FieldValue::new("id", Value::Int(seq as i64))],
            Position::key(seq as i64),
            seq,
        ))
    }

    #[tokio::test]
    async fn preserves_emission_order() {
        let (mut tx, mut rx) = record_channel(8);
        for seq in 1..=3 {
            tx.push(record(seq)).await.unwrap();
        }
        tx.push(StreamItem::Finished).await.unwrap();

        for seq in 1..=3 {
            let item = rx.pop().await.unwrap();
            assert_eq!(item.as_record().map(|r| r.sequence), Some(seq));
        }
        assert_eq!(rx.pop().await, Some(StreamItem::Finished));
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn push_blocks_when_full() {
        let (mut tx, mut rx) = record_channel(1);
        tx.push(record(1)).await.unwrap();

        let blocked = timeout(Duration::from_millis(50), tx.push(record(2))).await;
        assert!(blocked.is_err());

        assert!(rx.pop().await.is_some());
        tx.push(record(2)).await.unwrap();
    }

    #[tokio::test]
    async fn nothing_follows_a_terminal_marker() {
        let (mut tx, _rx) = record_channel(4);
        tx.push(StreamItem::Failed(FailureCause::new(FailureKind::Connection, "refused")))
            .await
            .unwrap();
        assert!(tx.is_terminated());
        assert_eq!(tx.push(record(1)).await, Err(ChannelError::AfterTerminal));
        assert_eq!(
            tx.push(StreamItem::Finished).await,
            Err(ChannelError::AfterTerminal)
        );
    }

    #[tokio::test]
    async fn closed_consumer_is_reported() {
        let (mut tx, mut rx) = record_channel(4);
        rx.close();
        assert_eq!(tx.push(record(1)).await, Err(ChannelError::Closed));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let (tx, _rx) = record_channel(0);
        assert_eq!(tx.capacity(), 1);
    }
}
