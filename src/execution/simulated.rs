//! Simulated work: each task occupies its worker for a duration derived from
//! its cost estimate.

use super::ExecutionUnit;
use crate::config::{ExecutionConfig, ExecutionMode};
use crate::error::{Error, Result};
use crate::scheduler::{Task, WorkerId};
use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::trace;

/// Execution unit that sleeps or spins for `cost_estimate * time_scale`
/// milliseconds, optionally spread by a random jitter.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    mode: ExecutionMode,
    time_scale: f64,
    jitter: f64,
}

impl Default for SimulatedExecution {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

impl SimulatedExecution {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            mode: config.mode,
            time_scale: config.time_scale.max(0.0),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale.max(0.0);
        self
    }

    /// How long a task of the given cost occupies its worker.
    pub fn duration_for(&self, cost_estimate: u64) -> Duration {
        let mut millis = cost_estimate as f64 * self.time_scale;
        if self.jitter > 0.0 && millis > 0.0 {
            let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            millis *= 1.0 + spread;
        }
        Duration::try_from_secs_f64(millis.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
    }
}

#[async_trait]
impl ExecutionUnit for SimulatedExecution {
    async fn run(&self, worker_id: WorkerId, task: &Task) -> Result<()> {
        let duration = self.duration_for(task.cost_estimate());
        trace!(worker = worker_id, task = %task.id(), ?duration, mode = ?self.mode, "simulating");

        match self.mode {
            ExecutionMode::Sleep => tokio::time::sleep(duration).await,
            ExecutionMode::Spin => {
                tokio::task::spawn_blocking(move || {
                    let deadline = Instant::now().checked_add(duration);
                    while deadline.map_or(true, |d| Instant::now() < d) {
                        std::hint::spin_loop();
                    }
                })
                .await
                .map_err(|e| Error::execution(task.id(), worker_id, e.to_string()))?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.mode {
            ExecutionMode::Sleep => "simulated-sleep",
            ExecutionMode::Spin => "simulated-spin",
        }
    }
}
