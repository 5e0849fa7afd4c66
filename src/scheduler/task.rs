//! The schedulable unit of work.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a worker inside the scheduler's pool.
pub type WorkerId = usize;

/// Unique, monotonically increasing task identity.
///
/// Ids are allocated by a single [`Scheduler`](super::Scheduler) instance
/// and are only unique within that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of work travelling through the scheduler.
///
/// Everything except the stolen marker is fixed at creation. The marker
/// flips at most once, when a thief pops the task off a peer's deque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    cost_estimate: u64,
    origin_worker: WorkerId,
    stolen: bool,
}

impl Task {
    pub(crate) fn new(id: TaskId, cost_estimate: u64, origin_worker: WorkerId) -> Self {
        Self {
            id,
            cost_estimate,
            origin_worker,
            stolen: false,
        }
    }

    /// Task identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Opaque cost weight, interpreted only by the execution unit.
    pub fn cost_estimate(&self) -> u64 {
        self.cost_estimate
    }

    /// Worker whose deque first received this task.
    pub fn origin_worker(&self) -> WorkerId {
        self.origin_worker
    }

    /// Whether a thief removed this task from its owner's deque.
    pub fn is_stolen(&self) -> bool {
        self.stolen
    }

    pub(crate) fn mark_stolen(&mut self) {
        debug_assert!(!self.stolen, "task {} stolen twice", self.id);
        self.stolen = true;
    }
}
