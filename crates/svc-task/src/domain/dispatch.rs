//! # Dispatch Queue
//!
//! Bounded FIFO between the bus callback and the task workers.
//!
//! ```text
//! bus callback ──send().await──→ [ e1 | e2 | ... | eN ] ──recv()──→ worker 1..n
//!                    │                 capacity N
//!                    └── waits while full
//! ```
//!
//! A full queue never drops an event: `send` waits for room, which in turn
//! holds up the bus callback task.

use crate::domain::errors::DispatchError;
use odim_telemetry::{HistogramTimer, TASK_DISPATCH_WAIT};
use shared_types::TaskEvent;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Create a dispatch queue holding at most `capacity` events.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn bounded(capacity: usize) -> (DispatchSender, DispatchReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    (
        DispatchSender { inner: sender, capacity },
        DispatchReceiver {
            inner: Mutex::new(receiver),
        },
    )
}

/// Write end of the dispatch queue.
#[derive(Debug, Clone)]
pub struct DispatchSender {
    inner: mpsc::Sender<TaskEvent>,
    capacity: usize,
}

impl DispatchSender {
    /// Enqueue an event, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// `DispatchError::Closed` once the read end has been dropped.
    pub async fn send(&self, event: TaskEvent) -> Result<(), DispatchError> {
        match self.inner.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(
                    task_id = %event.task_id,
                    capacity = self.capacity,
                    "Dispatch queue full, waiting"
                );
                let _timer = HistogramTimer::new(&TASK_DISPATCH_WAIT);
                self.inner
                    .send(event)
                    .await
                    .map_err(|e| DispatchError::Closed(e.0))
            }
            Err(mpsc::error::TrySendError::Closed(event)) => Err(DispatchError::Closed(event)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.capacity()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Read end of the dispatch queue, shared by all workers.
///
/// Workers take turns: each `recv` hands out the next event in arrival order.
#[derive(Debug)]
pub struct DispatchReceiver {
    inner: Mutex<mpsc::Receiver<TaskEvent>>,
}

impl DispatchReceiver {
    /// Next event, or `None` once every sender is gone and the queue is empty.
    pub async fn recv(&self) -> Option<TaskEvent> {
        self.inner.lock().await.recv().await
    }

    /// Next event if one is queued and no worker is currently waiting.
    #[must_use]
    pub fn try_recv(&self) -> Option<TaskEvent> {
        self.inner.try_lock().ok()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, rx) = bounded(8);
        for n in 0..5 {
            tx.send(TaskEvent::new(format!("T{n}"), "Running")).await.unwrap();
        }
        for n in 0..5 {
            assert_eq!(rx.recv().await.unwrap().task_id, format!("T{n}"));
        }
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_queue_waits_instead_of_dropping() {
        let (tx, rx) = bounded(1);
        tx.send(TaskEvent::new("T0", "Running")).await.unwrap();
        assert_eq!(tx.available(), 0);

        let writer = {
            let tx = tx.clone();
            tokio::spawn(async move { tx.send(TaskEvent::new("T1", "Running")).await })
        };

        // Writer is parked until a slot frees up
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());

        assert_eq!(rx.recv().await.unwrap().task_id, "T0");
        timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer still blocked")
            .unwrap()
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().task_id, "T1");
    }

    #[tokio::test]
    async fn test_closed_queue_returns_event() {
        let (tx, rx) = bounded(4);
        drop(rx);

        assert!(tx.is_closed());
        match tx.send(TaskEvent::new("T9", "Completed")).await {
            Err(DispatchError::Closed(event)) => assert_eq!(event.task_id, "T9"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recv_ends_after_senders_drop() {
        let (tx, rx) = bounded(4);
        tx.send(TaskEvent::new("T1", "Completed")).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().task_id, "T1");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shared_receiver_hands_out_each_event_once() {
        let (tx, rx) = bounded(16);
        let rx = Arc::new(rx);

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(event) = rx.recv().await {
                        seen.push(event.task_id);
                    }
                    seen
                })
            })
            .collect();

        for n in 0..30 {
            tx.send(TaskEvent::new(format!("T{n}"), "Running")).await.unwrap();
        }
        drop(tx);

        let mut all = Vec::new();
        for reader in readers {
            all.extend(timeout(Duration::from_secs(1), reader).await.unwrap().unwrap());
        }
        all.sort();
        let mut expected: Vec<_> = (0..30).map(|n| format!("T{n}")).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (tx, _rx) = bounded(0);
        assert_eq!(tx.capacity(), 1);
    }
}
