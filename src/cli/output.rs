//! Output formatting module for Worksteal
//!
//! Provides colored output, progress indicators, and JSON output.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use worksteal::runtime::ShutdownReport;
use worksteal::scheduler::WorkerSnapshot;

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{}", warn);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.json_mode {
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print any serializable value as a single JSON document
    pub fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Render one line per worker
    pub fn render_workers(&self, workers: &[WorkerSnapshot]) -> String {
        let show_ids = self.verbosity >= 1;
        let mut out = String::new();

        for worker in workers {
            let status = match (worker.busy, self.use_color) {
                (true, true) => "BUSY".green().bold().to_string(),
                (true, false) => "BUSY".to_string(),
                (false, true) => "idle".dimmed().to_string(),
                (false, false) => "idle".to_string(),
            };
            let current = worker
                .current_task
                .map_or_else(|| "-".to_string(), |id| id.to_string());

            out.push_str(&format!(
                "  W{:<3} {:<4}  running {:<6} queue {:>3} (cost {:>6})  done {:>4}  stolen {:>3}",
                worker.id,
                status,
                current,
                worker.queue_length,
                worker.queued_cost,
                worker.completed,
                worker.stolen
            ));

            if show_ids && !worker.queued.is_empty() {
                let ids: Vec<String> = worker
                    .queued
                    .iter()
                    .map(|q| {
                        let label = q.id.to_string();
                        match (q.stolen, self.use_color) {
                            (true, true) => format!("{}*", label).yellow().to_string(),
                            (true, false) => format!("{}*", label),
                            (false, _) => label,
                        }
                    })
                    .collect();
                out.push_str(&format!("  [{}]", ids.join(" ")));
            }
            out.push('\n');
        }
        out
    }

    /// Print a worker table
    pub fn workers(&self, workers: &[WorkerSnapshot]) {
        if self.json_mode {
            return;
        }
        print!("{}", self.render_workers(workers));
    }

    /// Print the final summary of a run
    pub fn summary(&self, report: &ShutdownReport) {
        if self.json_mode {
            return;
        }

        let stats = &report.stats;
        let sched = &stats.scheduler;
        let rows = [
            ("added", sched.tasks_added.to_string()),
            ("completed", sched.tasks_completed.to_string()),
            ("stolen", sched.tasks_stolen.to_string()),
            ("failed", sched.tasks_failed.to_string()),
            ("discarded", sched.tasks_discarded.to_string()),
            ("steal ratio", format!("{:.1}%", sched.steal_ratio() * 100.0)),
            ("elapsed", format!("{:.2?}", stats.elapsed)),
            ("throughput", format!("{:.1} tasks/s", stats.throughput())),
            ("utilization", format!("{:.1}%", stats.utilization() * 100.0)),
        ];

        let title = "SUMMARY";
        if self.use_color {
            println!("\n{}", title.bold());
        } else {
            println!("\n{}", title);
        }
        for (label, value) in rows {
            let label = format!("{:<12}", label);
            if self.use_color {
                println!("  {} {}", label.cyan(), value);
            } else {
                println!("  {} {}", label, value);
            }
        }

        if sched.tasks_failed > 0 {
            self.warning(&format!("{} task(s) reported failure", sched.tasks_failed));
        }
    }

    /// Create a progress bar counting completed tasks
    pub fn create_progress_bar(&self, len: u64, message: &str) -> Option<ProgressBar> {
        if self.json_mode {
            return None;
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Some(pb)
    }
}
