//! Shared helpers for the Worksteal test suite.
//!
//! The [`Driver`] stands in for the worker actors: it reads dispatches from
//! the mailboxes by hand so tests decide exactly when each task completes.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use worksteal::scheduler::{Mailbox, Scheduler, Task, TaskId, WorkerId, WorkerMessage};

/// A scheduler plus its mailboxes, with no actors attached.
pub struct Driver {
    pub scheduler: Arc<Scheduler>,
    mailboxes: Vec<Mailbox>,
    /// Task each worker was last handed, not yet completed
    running: Vec<Option<Task>>,
    /// Every dispatch seen, in order
    pub dispatched: Vec<(WorkerId, Task)>,
}

impl Driver {
    pub fn new(num_workers: usize) -> Self {
        let (scheduler, mailboxes) = Scheduler::new(num_workers).unwrap();
        Self {
            scheduler,
            mailboxes,
            running: vec![None; num_workers],
            dispatched: Vec::new(),
        }
    }

    /// Pull every pending dispatch out of the mailboxes.
    pub fn pump(&mut self) {
        for (worker_id, mailbox) in self.mailboxes.iter_mut().enumerate() {
            while let Some(message) = mailbox.try_recv() {
                match message {
                    WorkerMessage::TaskDispatch(task) => {
                        assert!(
                            self.running[worker_id].is_none(),
                            "worker {} dispatched twice",
                            worker_id
                        );
                        self.dispatched.push((worker_id, task.clone()));
                        self.running[worker_id] = Some(task);
                    }
                    other => panic!("unexpected message for worker {}: {:?}", worker_id, other),
                }
            }
        }
    }

    pub fn running(&self, worker_id: WorkerId) -> Option<&Task> {
        self.running[worker_id].as_ref()
    }

    pub fn running_id(&self, worker_id: WorkerId) -> Option<TaskId> {
        self.running(worker_id).map(Task::id)
    }

    /// Complete whatever `worker_id` is running and collect new dispatches.
    pub fn complete(&mut self, worker_id: WorkerId) -> TaskId {
        self.finish(worker_id, true)
    }

    /// Like [`complete`](Self::complete), reporting `success`.
    pub fn finish(&mut self, worker_id: WorkerId, success: bool) -> TaskId {
        let task = self.running[worker_id]
            .take()
            .unwrap_or_else(|| panic!("worker {} is idle", worker_id));
        self.scheduler
            .complete_task(worker_id, task.id(), success)
            .unwrap();
        self.pump();
        task.id()
    }

    /// Fire completions, lowest busy worker first, until nothing runs.
    pub fn run_to_quiescence(&mut self) {
        self.pump();
        while let Some(worker_id) = (0..self.running.len()).find(|&w| self.running[w].is_some()) {
            self.complete(worker_id);
        }
    }

    pub fn add(&mut self, worker_id: WorkerId, cost: u64) -> TaskId {
        let id = self.scheduler.add_task(worker_id, cost).unwrap();
        self.pump();
        id
    }

    pub fn assign(&mut self, worker_id: WorkerId, cost: u64) -> TaskId {
        let id = self.scheduler.assign_task(worker_id, cost).unwrap();
        self.pump();
        id
    }

    /// Ids dispatched so far, asserting none repeats.
    pub fn dispatched_ids(&self) -> Vec<TaskId> {
        let ids: Vec<TaskId> = self.dispatched.iter().map(|(_, t)| t.id()).collect();
        let unique: HashSet<TaskId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "a task was dispatched twice");
        ids
    }
}
