//! Execution units: what actually happens to a dispatched task.
//!
//! The scheduler never looks inside a task. Once a worker dispatches one,
//! the runtime hands it to an [`ExecutionUnit`] and posts exactly one
//! completion signal back to that worker when the unit returns, whether it
//! succeeded or not.

mod simulated;

pub use simulated::SimulatedExecution;

use crate::error::Result;
use crate::scheduler::{Task, WorkerId};
use async_trait::async_trait;
use std::future::Future;

/// Runs dispatched tasks.
#[async_trait]
pub trait ExecutionUnit: Send + Sync {
    /// Run `task` on behalf of `worker_id`.
    ///
    /// An `Err` is logged and counted as a failed task; the worker is freed
    /// either way.
    async fn run(&self, worker_id: WorkerId, task: &Task) -> Result<()>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Execution unit backed by an async closure.
///
/// # Examples
///
/// ```rust,ignore
/// let unit = FnExecution::new(|worker, task| async move {
///     tracing::info!(worker, task = %task.id(), "running");
///     Ok(())
/// });
/// ```
pub struct FnExecution<F> {
    f: F,
}

impl<F> FnExecution<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ExecutionUnit for FnExecution<F>
where
    F: Fn(WorkerId, Task) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn run(&self, worker_id: WorkerId, task: &Task) -> Result<()> {
        (self.f)(worker_id, task.clone()).await
    }

    fn name(&self) -> &str {
        "fn"
    }
}
