//! Read-only views of scheduler state.

use super::deque::QueuedTask;
use super::task::{TaskId, WorkerId};
use serde::Serialize;

/// Snapshot of one worker, safe to render or log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    /// Worker identity
    pub id: WorkerId,
    /// Whether a task is executing
    pub busy: bool,
    /// Number of queued tasks
    pub queue_length: usize,
    /// Queued tasks, front to back
    pub queued: Vec<QueuedTask>,
    /// Sum of cost estimates of the queued tasks
    pub queued_cost: u64,
    /// Task currently executing
    pub current_task: Option<TaskId>,
    /// Tasks this worker has completed
    pub completed: u64,
    /// Tasks this worker has stolen from peers
    pub stolen: u64,
}

/// Aggregate counters for a scheduler.
///
/// # Examples
///
/// ```rust,ignore
/// let stats = scheduler.stats();
/// println!("Steal ratio: {:.1}%", stats.steal_ratio() * 100.0);
/// println!("Load imbalance: {:.2}", stats.load_imbalance());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStats {
    /// Tasks admitted since construction.
    pub tasks_added: u64,
    /// Queued tasks removed without running (discarding shutdown).
    pub tasks_discarded: u64,
    /// Tasks whose completion signal has been processed.
    pub tasks_completed: u64,
    /// Tasks removed from a deque by a non-owner.
    pub tasks_stolen: u64,
    /// Completed tasks the execution unit reported as failed.
    pub tasks_failed: u64,
    /// Workers currently executing a task.
    pub busy_workers: usize,
    /// Queue length per worker.
    pub queue_sizes: Vec<usize>,
    /// Completed tasks per worker.
    pub completed_per_worker: Vec<u64>,
    /// Stolen tasks per thief.
    pub stolen_per_worker: Vec<u64>,
}

impl SchedulerStats {
    /// Total queued tasks across all workers.
    pub fn queued(&self) -> u64 {
        self.queue_sizes.iter().map(|&s| s as u64).sum()
    }

    /// Whether every admitted task is accounted for as queued, running,
    /// completed or discarded.
    pub fn is_conserved(&self) -> bool {
        self.tasks_added
            == self.queued()
                + self.busy_workers as u64
                + self.tasks_completed
                + self.tasks_discarded
    }

    /// Normalized standard deviation of queue lengths, capped at 1.0.
    ///
    /// 0.0 means every queue has the same length.
    pub fn load_imbalance(&self) -> f64 {
        if self.queue_sizes.is_empty() {
            return 0.0;
        }

        let total: usize = self.queue_sizes.iter().sum();
        if total == 0 {
            return 0.0;
        }

        let avg = total as f64 / self.queue_sizes.len() as f64;
        let variance: f64 = self
            .queue_sizes
            .iter()
            .map(|&s| {
                let diff = s as f64 - avg;
                diff * diff
            })
            .sum::<f64>()
            / self.queue_sizes.len() as f64;

        (variance.sqrt() / avg).min(1.0)
    }

    /// Stolen tasks relative to completed tasks.
    pub fn steal_ratio(&self) -> f64 {
        if self.tasks_completed == 0 {
            return 0.0;
        }
        self.tasks_stolen as f64 / self.tasks_completed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(queue_sizes: Vec<usize>) -> SchedulerStats {
        SchedulerStats {
            tasks_added: 0,
            tasks_discarded: 0,
            tasks_completed: 0,
            tasks_stolen: 0,
            tasks_failed: 0,
            busy_workers: 0,
            completed_per_worker: vec![0; queue_sizes.len()],
            stolen_per_worker: vec![0; queue_sizes.len()],
            queue_sizes,
        }
    }

    #[test]
    fn test_load_imbalance_calculation() {
        assert!(stats(vec![10, 10, 10, 10]).load_imbalance() < 0.01);
        assert!(stats(vec![40, 0, 0, 0]).load_imbalance() > 0.5);
        assert_eq!(stats(vec![0, 0]).load_imbalance(), 0.0);
    }

    #[test]
    fn test_steal_ratio() {
        let mut s = stats(vec![0, 0]);
        assert_eq!(s.steal_ratio(), 0.0);
        s.tasks_completed = 10;
        s.tasks_stolen = 3;
        assert!((s.steal_ratio() - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_conservation_check() {
        let mut s = stats(vec![2, 1]);
        s.tasks_added = 6;
        s.busy_workers = 2;
        s.tasks_completed = 1;
        assert!(s.is_conserved());
        s.tasks_completed = 0;
        assert!(!s.is_conserved());
    }
}
