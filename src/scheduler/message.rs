//! Messages exchanged over a worker's mailbox.

use super::task::{Task, TaskId, WorkerId};
use tokio::sync::mpsc;

/// Everything a worker mailbox can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// A task was handed to the worker and must be run by the execution unit.
    TaskDispatch(Task),
    /// The execution unit finished the worker's current task.
    TaskComplete {
        /// Finished task
        task_id: TaskId,
        /// Whether the execution unit reported success
        success: bool,
    },
    /// Stop the worker's actor loop.
    Shutdown,
}

/// Sending half of a worker mailbox.
pub type MailboxSender = mpsc::UnboundedSender<WorkerMessage>;

/// Receiving half of a worker mailbox, tagged with its worker.
#[derive(Debug)]
pub struct Mailbox {
    worker_id: WorkerId,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl Mailbox {
    pub(crate) fn channel(worker_id: WorkerId) -> (MailboxSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { worker_id, rx })
    }

    /// Worker this mailbox belongs to.
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Wait for the next message; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.rx.recv().await
    }

    /// Take the next message without waiting.
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }
}
