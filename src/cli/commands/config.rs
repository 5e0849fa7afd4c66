//! Config command - show the effective configuration

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::{Parser, ValueEnum};

/// Serialization format for `config`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML, loadable as a config file
    #[default]
    Toml,
    /// JSON
    Json,
}

/// Arguments for the config command
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Format to print in (JSON when --output json is set)
    #[arg(long, default_value = "toml")]
    pub format: ConfigFormat,
}

impl ConfigArgs {
    /// Execute the config command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.run(ctx).await
    }
}

#[async_trait::async_trait]
impl Runnable for ConfigArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        if ctx.json || self.format == ConfigFormat::Json {
            ctx.output.json(&ctx.config)?;
        } else {
            print!("{}", toml::to_string_pretty(&ctx.config)?);
        }
        Ok(0)
    }
}
