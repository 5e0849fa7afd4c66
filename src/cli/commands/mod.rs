//! Subcommands module for Worksteal CLI
//!
//! This module contains all the subcommand implementations.

pub mod config;
pub mod run;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use worksteal::config::Config;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// JSON output requested
    pub json: bool,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.output.color;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            json: cli.is_json(),
        }
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command, returning the process exit code
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
