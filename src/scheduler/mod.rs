//! Work-Stealing Scheduler
//!
//! A fixed pool of workers, each owning a deque. New tasks land at the back
//! of a target worker's deque and every idle worker is woken. A worker
//! drains its own deque from the front; once empty it asks the scheduler to
//! steal from a peer.
//!
//! ## Victim Selection
//!
//! Stealing is greedy and centralized: the thief always takes from the peer
//! with the longest queue (lowest id wins ties) and pops that peer's *back*,
//! the end the owner reaches last.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         Scheduler                           │
//! │                                                             │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐   │
//! │  │ Worker 0 │  │ Worker 1 │  │ Worker 2 │  │ Worker 3 │   │
//! │  │  front   │  │  front   │  │  front   │  │  front   │   │
//! │  │ ┌──────┐ │  │ ┌──────┐ │  │ ┌──────┐ │  │ ┌──────┐ │   │
//! │  │ │  #1  │ │  │ │      │ │  │ │  #4  │ │  │ │  #9  │ │   │
//! │  │ │  #2  │ │  │ │EMPTY │ │  │ │  #5  │ │  │ │      │ │   │
//! │  │ │  #3  │ │  │ │      │ │  │ │  #6  │◄──── STEAL   │   │
//! │  │ └──────┘ │  │ └──────┘ │  │ └──────┘ │  │ └──────┘ │   │
//! │  │  back    │  │  back    │  │  back    │  │  back    │   │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use worksteal::scheduler::Scheduler;
//!
//! let (scheduler, mut mailboxes) = Scheduler::new(4)?;
//! let id = scheduler.add_task(0, 1000)?;
//!
//! // Worker 0 was idle, so it took the task and dispatched it.
//! assert_eq!(scheduler.worker(0).unwrap().current_task(), Some(id));
//!
//! // The execution unit reports back.
//! scheduler.complete_task(0, id, true)?;
//! ```

pub mod deque;
pub mod message;
pub mod stats;
pub mod task;
pub mod worker;

pub use deque::{QueuedTask, TaskDeque};
pub use message::{Mailbox, MailboxSender, WorkerMessage};
pub use stats::{SchedulerStats, WorkerSnapshot};
pub use task::{Task, TaskId, WorkerId};
pub use worker::{WorkerNode, WorkerStatus};

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Coordinator for a fixed pool of [`WorkerNode`]s.
///
/// The scheduler exclusively owns its workers; each worker keeps only a weak
/// handle back to it. All methods take `&self` and are safe to call from any
/// thread.
pub struct Scheduler {
    workers: Vec<WorkerNode>,
    next_task_id: AtomicU64,
    tasks_added: AtomicU64,
    tasks_discarded: AtomicU64,
    /// Bumped after every processed completion or discard
    completions: watch::Sender<u64>,
}

impl Scheduler {
    /// Create a scheduler with `num_workers` idle workers.
    ///
    /// Returns one [`Mailbox`] per worker, in worker order. Dispatched tasks
    /// show up there as [`WorkerMessage::TaskDispatch`].
    pub fn new(num_workers: usize) -> Result<(Arc<Self>, Vec<Mailbox>)> {
        if num_workers == 0 {
            return Err(Error::EmptyPool);
        }

        let mut mailboxes = Vec::with_capacity(num_workers);
        let scheduler = Arc::new_cyclic(|handle| {
            let workers = (0..num_workers)
                .map(|id| {
                    let (tx, mailbox) = Mailbox::channel(id);
                    mailboxes.push(mailbox);
                    WorkerNode::new(id, tx, handle.clone())
                })
                .collect();

            Self {
                workers,
                next_task_id: AtomicU64::new(1),
                tasks_added: AtomicU64::new(0),
                tasks_discarded: AtomicU64::new(0),
                completions: watch::channel(0).0,
            }
        });

        debug!(workers = num_workers, "scheduler created");
        Ok((scheduler, mailboxes))
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn worker(&self, worker_id: WorkerId) -> Option<&WorkerNode> {
        self.workers.get(worker_id)
    }

    pub fn workers(&self) -> &[WorkerNode] {
        &self.workers
    }

    fn checked_worker(&self, worker_id: WorkerId) -> Result<&WorkerNode> {
        self.workers
            .get(worker_id)
            .ok_or_else(|| Error::invalid_worker(worker_id, self.workers.len()))
    }

    fn allocate_task(&self, origin: WorkerId, cost_estimate: u64) -> Task {
        let id = TaskId::new(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        self.tasks_added.fetch_add(1, Ordering::SeqCst);
        Task::new(id, cost_estimate, origin)
    }

    /// Admit a task onto the back of `worker_id`'s deque and wake idle workers.
    ///
    /// Idle workers are woken in ascending id order, so a lower-numbered idle
    /// peer may steal the task before its target gets to it. Use
    /// [`assign_task`](Self::assign_task) to give the target first claim.
    pub fn add_task(&self, worker_id: WorkerId, cost_estimate: u64) -> Result<TaskId> {
        let worker = self.checked_worker(worker_id)?;
        let task = self.allocate_task(worker_id, cost_estimate);
        let id = task.id();

        trace!(worker = worker_id, task = %id, cost = cost_estimate, "task admitted");
        worker.deque().push_back(task);
        self.notify_idle_workers();
        Ok(id)
    }

    /// Admit a task through the target worker's own `push_task`, then wake the
    /// remaining idle workers.
    pub fn assign_task(&self, worker_id: WorkerId, cost_estimate: u64) -> Result<TaskId> {
        let worker = self.checked_worker(worker_id)?;
        let task = self.allocate_task(worker_id, cost_estimate);
        let id = task.id();

        worker.push_task(task);
        self.notify_idle_workers();
        Ok(id)
    }

    /// Run `process` on every idle worker, lowest id first.
    pub fn notify_idle_workers(&self) {
        for worker in &self.workers {
            if !worker.is_busy() {
                worker.process();
            }
        }
    }

    /// Steal one task on behalf of `thief_id`.
    ///
    /// Picks the peer with the strictly longest queue (lowest id on ties) and
    /// pops the back of its deque. Returns `None` when no peer has queued work
    /// or `thief_id` is not in the pool.
    pub fn steal_work(&self, thief_id: WorkerId) -> Option<Task> {
        let thief = self.workers.get(thief_id)?;
        loop {
            let victim_id = self.select_victim(thief_id)?;

            // The victim may have been drained between the scan and the pop.
            let Some(mut task) = self.workers[victim_id].deque().pop_back() else {
                continue;
            };

            task.mark_stolen();
            thief.record_steal();
            trace!(
                thief = thief_id,
                victim = victim_id,
                task = %task.id(),
                "stole task"
            );
            return Some(task);
        }
    }

    fn select_victim(&self, thief_id: WorkerId) -> Option<WorkerId> {
        let mut best: Option<(WorkerId, usize)> = None;
        for worker in &self.workers {
            if worker.id() == thief_id {
                continue;
            }
            let len = worker.deque().len();
            if len == 0 {
                continue;
            }
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((worker.id(), len));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Deliver the completion signal for `task_id` to `worker_id`.
    ///
    /// The worker becomes idle and immediately looks for more work. A signal
    /// that does not match the worker's current task is rejected without
    /// touching any state.
    pub fn complete_task(&self, worker_id: WorkerId, task_id: TaskId, success: bool) -> Result<()> {
        let worker = self.checked_worker(worker_id)?;
        worker.on_task_complete(task_id, success)?;
        self.completions.send_modify(|n| *n += 1);
        Ok(())
    }

    /// Remove every queued task from every deque.
    ///
    /// Running tasks are unaffected.
    pub fn drain_queued(&self) -> Vec<Task> {
        let drained: Vec<Task> = self
            .workers
            .iter()
            .flat_map(|w| w.deque().drain())
            .collect();
        if !drained.is_empty() {
            self.tasks_discarded
                .fetch_add(drained.len() as u64, Ordering::SeqCst);
            self.completions.send_modify(|n| *n += 1);
            warn!(count = drained.len(), "removed queued tasks");
        }
        drained
    }

    /// True when every admitted task has completed or been discarded.
    ///
    /// Finished counters are read before the admission counter, so a `true`
    /// result never races with a task that is mid-steal or mid-admission.
    pub fn is_quiescent(&self) -> bool {
        let finished: u64 = self
            .workers
            .iter()
            .map(WorkerNode::completed_count)
            .sum::<u64>()
            + self.tasks_discarded.load(Ordering::SeqCst);
        finished == self.tasks_added.load(Ordering::SeqCst)
    }

    /// Subscribe to completion events, for waiting on quiescence.
    pub fn subscribe_completions(&self) -> watch::Receiver<u64> {
        self.completions.subscribe()
    }

    pub(crate) fn mailbox(&self, worker_id: WorkerId) -> Option<&MailboxSender> {
        self.workers.get(worker_id).map(WorkerNode::mailbox)
    }

    /// Per-worker read-only snapshot.
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(WorkerNode::snapshot).collect()
    }

    pub fn stats(&self) -> SchedulerStats {
        let snapshots = self.snapshot();
        SchedulerStats {
            tasks_added: self.tasks_added.load(Ordering::SeqCst),
            tasks_discarded: self.tasks_discarded.load(Ordering::SeqCst),
            tasks_completed: snapshots.iter().map(|s| s.completed).sum(),
            tasks_stolen: snapshots.iter().map(|s| s.stolen).sum(),
            tasks_failed: self.workers.iter().map(WorkerNode::failed_count).sum(),
            busy_workers: snapshots.iter().filter(|s| s.busy).count(),
            queue_sizes: snapshots.iter().map(|s| s.queue_length).collect(),
            completed_per_worker: snapshots.iter().map(|s| s.completed).collect(),
            stolen_per_worker: snapshots.iter().map(|s| s.stolen).collect(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.workers)
            .field("tasks_added", &self.tasks_added.load(Ordering::SeqCst))
            .finish()
    }
}
