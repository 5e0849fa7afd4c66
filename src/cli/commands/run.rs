//! Run command - push a simulated workload through the scheduler
//!
//! Tasks are admitted round-robin over the `--target` workers. While they
//! run, the command keeps a progress bar and prints worker snapshots at the
//! configured interval.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use worksteal::config::ExecutionMode;
use worksteal::execution::SimulatedExecution;
use worksteal::runtime::{SchedulerRuntime, ShutdownPolicy};

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Number of workers (defaults to the configured pool size)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Number of tasks to admit
    #[arg(short = 'n', long, default_value = "12")]
    pub tasks: usize,

    /// Cost estimate of each task
    #[arg(long, default_value = "200")]
    pub cost: u64,

    /// Worker(s) receiving the tasks, round-robin
    #[arg(short = 't', long, action = clap::ArgAction::Append)]
    pub target: Vec<usize>,

    /// Give the target worker first claim on each task
    #[arg(long)]
    pub affinity: bool,

    /// What to do with queued tasks at shutdown
    #[arg(long)]
    pub shutdown_policy: Option<ShutdownPolicy>,

    /// Simulated execution mode
    #[arg(long)]
    pub mode: Option<ExecutionMode>,

    /// Milliseconds of simulated work per unit of cost
    #[arg(long)]
    pub time_scale: Option<f64>,

    /// Interval between worker snapshots (e.g. "250ms"); 0 disables them
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    pub snapshot_interval: Option<Duration>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.run(ctx).await
    }

    fn targets(&self) -> Vec<usize> {
        if self.target.is_empty() {
            vec![0]
        } else {
            self.target.clone()
        }
    }

    fn admit(&self, runtime: &SchedulerRuntime) -> worksteal::Result<()> {
        let targets = self.targets();
        for i in 0..self.tasks {
            let worker = targets[i % targets.len()];
            if self.affinity {
                runtime.assign_task(worker, self.cost)?;
            } else {
                runtime.add_task(worker, self.cost)?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for RunArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut execution = ctx.config.execution.clone();
        if let Some(mode) = self.mode {
            execution.mode = mode;
        }
        if let Some(scale) = self.time_scale {
            execution.time_scale = scale;
        }
        let workers = self.workers.unwrap_or(ctx.config.scheduler.num_workers);
        let policy = self
            .shutdown_policy
            .unwrap_or(ctx.config.scheduler.shutdown_policy);
        let interval = self
            .snapshot_interval
            .unwrap_or(ctx.config.output.snapshot_interval);

        let mut effective = ctx.config.clone();
        effective.scheduler.num_workers = workers;
        effective.execution = execution.clone();
        effective.validate().context("Invalid run options")?;

        ctx.output.banner("WORKSTEAL RUN");
        ctx.output.info(&format!(
            "{} workers, {} tasks of cost {} on {:?} ({:?}, policy {:?})",
            workers,
            self.tasks,
            self.cost,
            self.targets(),
            execution.mode,
            policy
        ));

        let unit = Arc::new(SimulatedExecution::from_config(&execution));
        let runtime = SchedulerRuntime::start(workers, unit)?;

        if let Err(e) = self.admit(&runtime) {
            runtime.shutdown(ShutdownPolicy::Discard).await?;
            return Err(e).context("Failed to admit tasks");
        }

        let progress = ctx
            .output
            .create_progress_bar(self.tasks as u64, "tasks completed");

        {
            let quiescent = runtime.wait_for_quiescence();
            tokio::pin!(quiescent);
            let mut ticker = tokio::time::interval(if interval.is_zero() {
                Duration::from_millis(100)
            } else {
                interval
            });

            loop {
                tokio::select! {
                    () = &mut quiescent => break,
                    _ = ticker.tick() => {
                        let stats = runtime.stats();
                        if let Some(pb) = &progress {
                            pb.set_position(stats.scheduler.tasks_completed);
                            if !interval.is_zero() {
                                let table = ctx.output.render_workers(&runtime.snapshot());
                                pb.suspend(|| print!("{}", table));
                            }
                        }
                    }
                }
            }
        }

        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        let final_workers = runtime.snapshot();
        let report = runtime.shutdown(policy).await?;

        if ctx.json {
            ctx.output.json(&json!({
                "workers": final_workers,
                "report": report,
            }))?;
        } else {
            ctx.output.workers(&final_workers);
            ctx.output.summary(&report);
        }

        Ok(if report.stats.scheduler.tasks_failed > 0 { 2 } else { 0 })
    }
}
