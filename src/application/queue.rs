//! FIFO hand-off between the capture manager and the finalization worker

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};

/// Outstanding-task counter shared by both ends of the queue
#[derive(Debug, Default)]
struct PendingTasks {
    count: AtomicUsize,
    drained: Notify,
}

impl PendingTasks {
    fn finish_one(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Marks one dequeued task as done when dropped.
///
/// Held by the consumer for the whole processing of a task so the slot is
/// released on every path, including early returns and panics.
#[derive(Debug)]
pub struct TaskDone {
    pending: Arc<PendingTasks>,
}

impl Drop for TaskDone {
    fn drop(&mut self) {
        self.pending.finish_one();
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug)]
pub struct TaskQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    pending: Arc<PendingTasks>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            pending: Arc::clone(&self.pending),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

/// Consumer side of the queue
#[derive(Debug)]
pub struct TaskReceiver<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    pending: Arc<PendingTasks>,
    shutdown: watch::Receiver<bool>,
    closed: bool,
}

/// Create a connected producer/consumer pair
pub fn task_queue<T>() -> (TaskQueue<T>, TaskReceiver<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pending = Arc::new(PendingTasks::default());

    (
        TaskQueue {
            sender,
            pending: Arc::clone(&pending),
            shutdown: Arc::new(shutdown_tx),
        },
        TaskReceiver {
            receiver,
            pending,
            shutdown: shutdown_rx,
            closed: false,
        },
    )
}

impl<T> TaskQueue<T> {
    /// Enqueue a task.
    ///
    /// # Returns
    /// The task back if the queue no longer accepts work (shutdown started or
    /// consumer gone)
    pub fn enqueue(&self, task: T) -> Result<(), T> {
        self.pending.count.fetch_add(1, Ordering::SeqCst);
        match self.sender.send(task) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(task)) => {
                self.pending.finish_one();
                Err(task)
            }
        }
    }

    /// Number of tasks enqueued and not yet marked done
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Signal shutdown. The consumer stops accepting new tasks, drains what
    /// is already queued, and then finishes.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether shutdown has been signalled
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Wait until every enqueued task has been marked done
    pub async fn join(&self) {
        loop {
            let drained = self.pending.drained.notified();
            if self.pending() == 0 {
                return;
            }
            drained.await;
        }
    }
}

impl<T> TaskReceiver<T> {
    /// Receive the next task with its completion guard.
    ///
    /// # Returns
    /// `None` once shutdown is signalled (or every producer is gone) and the
    /// queue is empty
    pub async fn recv(&mut self) -> Option<(T, TaskDone)> {
        loop {
            if !self.closed && *self.shutdown.borrow() {
                self.receiver.close();
                self.closed = true;
            }

            let task = if self.closed {
                self.receiver.recv().await
            } else {
                tokio::select! {
                    task = self.receiver.recv() => task,
                    changed = self.shutdown.changed() => {
                        if changed.is_err() {
                            // Every producer is gone; recv() drains and ends.
                            self.closed = true;
                        }
                        continue;
                    }
                }
            };

            return task.map(|task| {
                (
                    task,
                    TaskDone {
                        pending: Arc::clone(&self.pending),
                    },
                )
            });
        }
    }
}
