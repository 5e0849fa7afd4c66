//! Actor runtime driving a [`Scheduler`] on tokio.
//!
//! Every worker gets one actor task draining its mailbox:
//!
//! - `TaskDispatch` spawns the execution unit for that task, which posts
//!   `TaskComplete` back into the same mailbox when it returns
//! - `TaskComplete` is handed to [`Scheduler::complete_task`], which frees the
//!   worker and lets it drain or steal again
//! - `Shutdown` ends the actor
//!
//! # Example
//!
//! ```rust,ignore
//! use worksteal::prelude::*;
//!
//! let runtime = SchedulerRuntime::start(4, Arc::new(SimulatedExecution::default()))?;
//! for _ in 0..3 {
//!     runtime.add_task(0, 1000)?;
//! }
//! runtime.wait_for_quiescence().await;
//! let report = runtime.shutdown(ShutdownPolicy::Drain).await?;
//! println!("completed {}", report.stats.scheduler.tasks_completed);
//! ```

use crate::error::{Error, Result};
use crate::execution::ExecutionUnit;
use crate::scheduler::{
    Mailbox, Scheduler, SchedulerStats, Task, TaskId, WorkerId, WorkerMessage, WorkerSnapshot,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// What happens to queued tasks when the runtime shuts down.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Keep scheduling until every queued task has run
    #[default]
    Drain,
    /// Remove queued tasks and hand them back in the report; running tasks
    /// still finish
    Discard,
}

impl FromStr for ShutdownPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drain" => Ok(Self::Drain),
            "discard" | "drop" => Ok(Self::Discard),
            other => Err(Error::invalid_config(
                "scheduler.shutdown_policy",
                format!("unknown policy '{}', expected drain or discard", other),
            )),
        }
    }
}

/// Outcome of [`SchedulerRuntime::shutdown`].
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    /// Policy that was applied
    pub policy: ShutdownPolicy,
    /// Tasks removed from queues without running
    pub discarded: Vec<Task>,
    /// Final counters
    pub stats: RuntimeStats,
}

/// Scheduler counters plus wall-clock figures.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    /// Scheduler counters
    #[serde(flatten)]
    pub scheduler: SchedulerStats,
    /// Time since the runtime started
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Total time spent inside the execution unit, summed over tasks
    #[serde(with = "humantime_serde")]
    pub busy_time: Duration,
}

impl RuntimeStats {
    /// Completed tasks per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.scheduler.tasks_completed as f64 / secs
    }

    /// Fraction of worker capacity spent executing tasks.
    pub fn utilization(&self) -> f64 {
        let workers = self.scheduler.queue_sizes.len() as f64;
        let capacity = self.elapsed.as_secs_f64() * workers;
        if capacity == 0.0 {
            return 0.0;
        }
        (self.busy_time.as_secs_f64() / capacity).min(1.0)
    }
}

/// A running scheduler with one actor per worker.
pub struct SchedulerRuntime {
    scheduler: Arc<Scheduler>,
    actors: Mutex<Option<JoinSet<()>>>,
    busy_micros: Arc<AtomicU64>,
    started: Instant,
    shut_down: AtomicBool,
}

impl SchedulerRuntime {
    /// Build a scheduler with `num_workers` workers and spawn their actors.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(num_workers: usize, unit: Arc<dyn ExecutionUnit>) -> Result<Self> {
        let (scheduler, mailboxes) = Scheduler::new(num_workers)?;
        let busy_micros = Arc::new(AtomicU64::new(0));

        let mut actors = JoinSet::new();
        for mailbox in mailboxes {
            actors.spawn(worker_loop(
                Arc::clone(&scheduler),
                Arc::clone(&unit),
                Arc::clone(&busy_micros),
                mailbox,
            ));
        }

        info!(workers = num_workers, unit = unit.name(), "scheduler runtime started");

        Ok(Self {
            scheduler,
            actors: Mutex::new(Some(actors)),
            busy_micros,
            started: Instant::now(),
            shut_down: AtomicBool::new(false),
        })
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(Error::RuntimeShutdown);
        }
        Ok(())
    }

    /// Underlying scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// See [`Scheduler::add_task`].
    pub fn add_task(&self, worker_id: WorkerId, cost_estimate: u64) -> Result<TaskId> {
        self.ensure_running()?;
        self.scheduler.add_task(worker_id, cost_estimate)
    }

    /// See [`Scheduler::assign_task`].
    pub fn assign_task(&self, worker_id: WorkerId, cost_estimate: u64) -> Result<TaskId> {
        self.ensure_running()?;
        self.scheduler.assign_task(worker_id, cost_estimate)
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.scheduler.snapshot()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            scheduler: self.scheduler.stats(),
            elapsed: self.started.elapsed(),
            busy_time: Duration::from_micros(self.busy_micros.load(Ordering::Relaxed)),
        }
    }

    /// Resolve once every admitted task has completed or been discarded.
    pub async fn wait_for_quiescence(&self) {
        let mut completions = self.scheduler.subscribe_completions();
        loop {
            completions.borrow_and_update();
            if self.scheduler.is_quiescent() {
                return;
            }
            if completions.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stop the runtime according to `policy` and wait for the actors to exit.
    pub async fn shutdown(&self, policy: ShutdownPolicy) -> Result<ShutdownReport> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Err(Error::RuntimeShutdown);
        }

        info!(?policy, "shutting down scheduler runtime");
        let discarded = match policy {
            ShutdownPolicy::Drain => Vec::new(),
            ShutdownPolicy::Discard => self.scheduler.drain_queued(),
        };

        self.wait_for_quiescence().await;

        for worker in self.scheduler.workers() {
            if let Some(mailbox) = self.scheduler.mailbox(worker.id()) {
                if mailbox.send(WorkerMessage::Shutdown).is_err() {
                    warn!(worker = worker.id(), "actor already gone");
                }
            }
        }

        let actors = self.actors.lock().take();
        if let Some(mut actors) = actors {
            while let Some(joined) = actors.join_next().await {
                joined?;
            }
        }

        let stats = self.stats();
        info!(
            completed = stats.scheduler.tasks_completed,
            stolen = stats.scheduler.tasks_stolen,
            discarded = discarded.len(),
            "scheduler runtime stopped"
        );

        Ok(ShutdownReport {
            policy,
            discarded,
            stats,
        })
    }
}

async fn worker_loop(
    scheduler: Arc<Scheduler>,
    unit: Arc<dyn ExecutionUnit>,
    busy_micros: Arc<AtomicU64>,
    mut mailbox: Mailbox,
) {
    let worker_id = mailbox.worker_id();
    let Some(completions) = scheduler.mailbox(worker_id).cloned() else {
        return;
    };

    while let Some(message) = mailbox.recv().await {
        match message {
            WorkerMessage::TaskDispatch(task) => {
                let unit = Arc::clone(&unit);
                let completions = completions.clone();
                let busy_micros = Arc::clone(&busy_micros);
                tokio::spawn(async move {
                    let started = Instant::now();

                    // A panicking unit must still free the worker.
                    let run = {
                        let task = task.clone();
                        tokio::spawn(async move { unit.run(worker_id, &task).await })
                    };
                    let success = match run.await {
                        Ok(Ok(())) => true,
                        Ok(Err(e)) => {
                            warn!(worker = worker_id, task = %task.id(), error = %e, "task failed");
                            false
                        }
                        Err(e) => {
                            warn!(worker = worker_id, task = %task.id(), error = %e, "execution unit aborted");
                            false
                        }
                    };
                    let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                    busy_micros.fetch_add(micros, Ordering::Relaxed);

                    let signal = WorkerMessage::TaskComplete {
                        task_id: task.id(),
                        success,
                    };
                    if completions.send(signal).is_err() {
                        warn!(worker = worker_id, task = %task.id(), "completion signal lost");
                    }
                });
            }
            WorkerMessage::TaskComplete { task_id, success } => {
                if let Err(e) = scheduler.complete_task(worker_id, task_id, success) {
                    warn!(worker = worker_id, error = %e, "ignoring completion signal");
                }
            }
            WorkerMessage::Shutdown => {
                debug!(worker = worker_id, "worker actor stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shutdown_policy() {
        assert_eq!("drain".parse::<ShutdownPolicy>().unwrap(), ShutdownPolicy::Drain);
        assert_eq!("Discard".parse::<ShutdownPolicy>().unwrap(), ShutdownPolicy::Discard);
        assert!("later".parse::<ShutdownPolicy>().is_err());
    }

    #[test]
    fn test_throughput_and_utilization() {
        let stats = RuntimeStats {
            scheduler: SchedulerStats {
                tasks_added: 10,
                tasks_discarded: 0,
                tasks_completed: 10,
                tasks_stolen: 2,
                tasks_failed: 0,
                busy_workers: 0,
                queue_sizes: vec![0, 0],
                completed_per_worker: vec![6, 4],
                stolen_per_worker: vec![0, 2],
            },
            elapsed: Duration::from_secs(2),
            busy_time: Duration::from_secs(2),
        };
        assert!((stats.throughput() - 5.0).abs() < f64::EPSILON);
        assert!((stats.utilization() - 0.5).abs() < f64::EPSILON);
    }
}
