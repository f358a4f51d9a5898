//! Bounded FIFO of pending atomic tasks.
//!
//! [`TaskQueue`] is multi-producer/multi-consumer. Producers (reduction
//! engines) use the async [`enqueue`](TaskQueue::enqueue), which waits while
//! the queue is full. Consumers (workers) use the non-blocking
//! [`try_dequeue`](TaskQueue::try_dequeue) and back off on `None`.
//!
//! # Concurrency
//!
//! Backed by a bounded `tokio::sync::mpsc` channel. The single receiver sits
//! behind a `parking_lot::Mutex` so any number of consumers can poll; the lock
//! is only held for a `try_recv`, never across an await point.

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::error::CalcError;
use crate::types::task::AtomicTask;

/// Bounded FIFO of [`AtomicTask`]s awaiting a worker.
///
/// # Examples
///
/// ```
/// use dcalc::{AtomicTask, ExpressionId, Operator, TaskQueue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = TaskQueue::new(4);
/// queue
///     .enqueue(AtomicTask::new(ExpressionId(1), 2.0, 3.0, Operator::Add, 0))
///     .await
///     .unwrap();
/// assert_eq!(queue.len(), 1);
/// assert_eq!(queue.try_dequeue().map(|t| t.arg2), Some(3.0));
/// assert!(queue.try_dequeue().is_none());
/// # }
/// ```
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<AtomicTask>,
    rx: Mutex<mpsc::Receiver<AtomicTask>>,
    capacity: usize,
}

impl TaskQueue {
    /// Creates a queue holding at most `capacity` tasks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`CalcConfig::validate`](crate::CalcConfig::validate)
    /// rejects that value before a queue is built from configuration.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Appends a task, waiting while the queue is full.
    pub async fn enqueue(&self, task: AtomicTask) -> Result<(), CalcError> {
        self.tx.send(task).await.map_err(|_| CalcError::QueueClosed)
    }

    /// Appends a task if there is room, handing it back otherwise.
    pub fn try_enqueue(&self, task: AtomicTask) -> Result<(), AtomicTask> {
        self.tx.try_send(task).map_err(|err| err.into_inner())
    }

    /// Removes and returns the oldest task, or `None` if the queue is empty.
    pub fn try_dequeue(&self) -> Option<AtomicTask> {
        match self.rx.lock().try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of tasks currently waiting.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Returns `true` if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of waiting tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
