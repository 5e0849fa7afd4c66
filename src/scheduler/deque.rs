//! Per-worker task deque.
//!
//! The owning worker takes work from the front so its own tasks run in
//! submission order; thieves take from the back, the end the owner touches
//! last. Every operation holds the lock for a single push or pop only.

use super::task::{Task, TaskId};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Queued task as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueuedTask {
    /// Task identity
    pub id: TaskId,
    /// Stolen marker at the time of the snapshot
    pub stolen: bool,
}

#[derive(Debug, Default)]
struct DequeInner {
    tasks: VecDeque<Task>,
    /// Sum of cost estimates of queued tasks
    total_cost: u64,
}

/// A double-ended task queue shared between its owner and thieves.
#[derive(Debug, Default)]
pub struct TaskDeque {
    inner: Mutex<DequeInner>,
}

impl TaskDeque {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task at the back.
    pub fn push_back(&self, task: Task) {
        let mut inner = self.inner.lock();
        inner.total_cost = inner.total_cost.saturating_add(task.cost_estimate());
        inner.tasks.push_back(task);
    }

    /// Owner-side removal (FIFO).
    pub fn pop_front(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.pop_front()?;
        inner.total_cost = inner.total_cost.saturating_sub(task.cost_estimate());
        Some(task)
    }

    /// Thief-side removal.
    pub fn pop_back(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.pop_back()?;
        inner.total_cost = inner.total_cost.saturating_sub(task.cost_estimate());
        Some(task)
    }

    /// Remove every queued task, front to back.
    pub fn drain(&self) -> Vec<Task> {
        let mut inner = self.inner.lock();
        inner.total_cost = 0;
        inner.tasks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }

    /// Total queued cost.
    pub fn total_cost(&self) -> u64 {
        self.inner.lock().total_cost
    }

    /// Ids and stolen markers of queued tasks, front to back.
    pub fn queued(&self) -> Vec<QueuedTask> {
        self.inner
            .lock()
            .tasks
            .iter()
            .map(|t| QueuedTask {
                id: t.id(),
                stolen: t.is_stolen(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64) -> Task {
        Task::new(TaskId::new(id), id * 10, 0)
    }

    #[test]
    fn test_owner_pops_in_push_order() {
        let deque = TaskDeque::new();
        deque.push_back(task(1));
        deque.push_back(task(2));
        deque.push_back(task(3));

        assert_eq!(deque.len(), 3);
        assert_eq!(deque.pop_front().unwrap().id(), TaskId::new(1));
        assert_eq!(deque.pop_front().unwrap().id(), TaskId::new(2));
        assert_eq!(deque.pop_front().unwrap().id(), TaskId::new(3));
        assert!(deque.pop_front().is_none());
    }

    #[test]
    fn test_thief_pops_newest_first() {
        let deque = TaskDeque::new();
        deque.push_back(task(1));
        deque.push_back(task(2));
        deque.push_back(task(3));

        assert_eq!(deque.pop_back().unwrap().id(), TaskId::new(3));
        assert_eq!(deque.pop_front().unwrap().id(), TaskId::new(1));
        assert_eq!(deque.pop_back().unwrap().id(), TaskId::new(2));
        assert!(deque.is_empty());
    }

    #[test]
    fn test_total_cost_tracks_contents() {
        let deque = TaskDeque::new();
        deque.push_back(task(1));
        deque.push_back(task(2));
        assert_eq!(deque.total_cost(), 30);

        deque.pop_back();
        assert_eq!(deque.total_cost(), 10);

        let drained = deque.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(deque.total_cost(), 0);
    }

    #[test]
    fn test_queued_view_is_front_to_back() {
        let deque = TaskDeque::new();
        deque.push_back(task(5));
        deque.push_back(task(6));

        let ids: Vec<u64> = deque.queued().iter().map(|q| q.id.get()).collect();
        assert_eq!(ids, vec![5, 6]);
        assert!(deque.queued().iter().all(|q| !q.stolen));
    }
}
