//! Worker node state machine.
//!
//! ```text
//! Idle --push_task/process (local or stolen task found)--> Busy
//! Busy --on_task_complete--> Idle --process (drains or steals)--> Busy | Idle
//! ```
//!
//! A worker runs at most one task at a time. The decision to take work and
//! the transition to `Busy` happen under the worker's state lock, so
//! concurrent `process` calls on the same worker never dispatch twice.

use super::deque::TaskDeque;
use super::message::{MailboxSender, WorkerMessage};
use super::stats::WorkerSnapshot;
use super::task::{Task, TaskId, WorkerId};
use super::Scheduler;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use tracing::{debug, trace, warn};

/// Observable worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// No task executing
    Idle,
    /// Exactly one task executing
    Busy,
}

#[derive(Debug, Default)]
struct WorkerState {
    current_task: Option<Task>,
}

/// One execution slot of the pool, owning a deque.
pub struct WorkerNode {
    id: WorkerId,
    deque: TaskDeque,
    state: Mutex<WorkerState>,
    mailbox: MailboxSender,
    /// Non-owning handle back to the scheduler that owns this worker
    scheduler: Weak<Scheduler>,
    completed: AtomicU64,
    stolen: AtomicU64,
    failed: AtomicU64,
}

impl WorkerNode {
    pub(crate) fn new(id: WorkerId, mailbox: MailboxSender, scheduler: Weak<Scheduler>) -> Self {
        Self {
            id,
            deque: TaskDeque::new(),
            state: Mutex::new(WorkerState::default()),
            mailbox,
            scheduler,
            completed: AtomicU64::new(0),
            stolen: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn deque(&self) -> &TaskDeque {
        &self.deque
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().current_task.is_some()
    }

    pub fn status(&self) -> WorkerStatus {
        if self.is_busy() {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Idle
        }
    }

    /// Id of the task currently executing, if any.
    pub fn current_task(&self) -> Option<TaskId> {
        self.state.lock().current_task.as_ref().map(Task::id)
    }

    /// Queue a task directly on this worker and give it first claim on it.
    pub fn push_task(&self, task: Task) {
        trace!(worker = self.id, task = %task.id(), "task pushed directly");
        self.deque.push_back(task);
        self.process();
    }

    /// Take the next piece of work if idle: own deque first, then a steal.
    pub fn process(&self) {
        let mut state = self.state.lock();
        if state.current_task.is_some() {
            return;
        }

        let task = match self.deque.pop_front() {
            Some(task) => {
                trace!(worker = self.id, task = %task.id(), "popped local task");
                task
            }
            None => {
                let Some(scheduler) = self.scheduler.upgrade() else {
                    return;
                };
                match scheduler.steal_work(self.id) {
                    Some(task) => task,
                    None => return,
                }
            }
        };

        self.execute(&mut state, task);
    }

    fn execute(&self, state: &mut WorkerState, task: Task) {
        debug!(
            worker = self.id,
            task = %task.id(),
            cost = task.cost_estimate(),
            stolen = task.is_stolen(),
            "dispatching task"
        );
        state.current_task = Some(task.clone());

        // The worker stays busy without a live mailbox: nothing will ever
        // complete this task, which is visible through snapshots.
        if self.mailbox.send(WorkerMessage::TaskDispatch(task)).is_err() {
            warn!(worker = self.id, "mailbox closed, dispatched task cannot run");
        }
    }

    /// Handle the completion signal for the current task, then look for more.
    pub fn on_task_complete(&self, task_id: TaskId, success: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            match state.current_task.as_ref() {
                Some(current) if current.id() == task_id => {
                    state.current_task = None;
                }
                other => {
                    return Err(Error::UnexpectedCompletion {
                        worker_id: self.id,
                        task_id,
                        current: other.map_or_else(
                            || "nothing".to_string(),
                            |t| format!("task {}", t.id()),
                        ),
                    });
                }
            }
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        debug!(worker = self.id, task = %task_id, success, "task complete");

        self.process();
        Ok(())
    }

    pub(crate) fn record_steal(&self) {
        self.stolen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mailbox(&self) -> &MailboxSender {
        &self.mailbox
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn stolen_count(&self) -> u64 {
        self.stolen.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Read-only view for observers.
    pub fn snapshot(&self) -> WorkerSnapshot {
        let state = self.state.lock();
        let queued = self.deque.queued();
        WorkerSnapshot {
            id: self.id,
            busy: state.current_task.is_some(),
            queue_length: queued.len(),
            queued,
            queued_cost: self.deque.total_cost(),
            current_task: state.current_task.as_ref().map(Task::id),
            completed: self.completed_count(),
            stolen: self.stolen_count(),
        }
    }
}

impl std::fmt::Debug for WorkerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerNode")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("queue_length", &self.deque.len())
            .finish()
    }
}
