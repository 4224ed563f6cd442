// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # chunkswarm CLI
//!
//! The `chunkswarm` binary drives a job's chunk queue and the elastic
//! swarm of workers that drains it.
//!
//! ## Commands
//!
//! - `chunkswarm job create|reset|status|requeue|fail` - Job and chunk administration
//! - `chunkswarm chunk request|complete` - Single queue operations for worker scripts
//! - `chunkswarm work` - Worker loop, optionally priming swarm growth
//! - `chunkswarm swarm probe|grow` - Capacity probe and one growth cycle
//! - `chunkswarm config show|validate|generate` - Configuration management
//! - `chunkswarm update` - Apply chunk store migrations
//!
//! Logs go to stderr so `chunk request` output on stdout stays machine readable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use chunkswarm_cli::commands::{
    self, ChunkCommand, ConfigCommand, JobCommand, SwarmCommand, UpdateCommand, WorkCommand,
};

/// chunkswarm - Chunk work-queue with an elastic worker swarm
#[derive(Parser)]
#[command(name = "chunkswarm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CHUNKSWARM_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CHUNKSWARM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Job and chunk administration
    #[command(name = "job")]
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },

    /// Claim or complete a single chunk
    #[command(name = "chunk")]
    Chunk {
        #[command(subcommand)]
        command: ChunkCommand,
    },

    /// Run the worker loop for a job
    #[command(name = "work")]
    Work {
        #[command(flatten)]
        command: WorkCommand,
    },

    /// Swarm sizing
    #[command(name = "swarm")]
    Swarm {
        #[command(subcommand)]
        command: SwarmCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Update the chunk store schema
    #[command(name = "update")]
    Update {
        #[command(flatten)]
        command: UpdateCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;
    debug!(config = ?cli.config, "chunkswarm starting");

    match cli.command {
        Some(Commands::Job { command }) => commands::job::handle_command(command, cli.config).await,
        Some(Commands::Chunk { command }) => {
            commands::chunk::handle_command(command, cli.config).await
        }
        Some(Commands::Work { command }) => commands::work::execute(command, cli.config).await,
        Some(Commands::Swarm { command }) => {
            commands::swarm::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Update { command }) => commands::update::execute(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_chunk_request() {
        let cli = Cli::try_parse_from([
            "chunkswarm",
            "chunk",
            "request",
            "--worker-id",
            "7",
            "--job-id",
            "201",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Chunk { .. })));
    }

    #[test]
    fn test_rejects_negative_job_id() {
        let result = Cli::try_parse_from(["chunkswarm", "job", "status", "--", "-4"]);
        assert!(result.is_err());
    }
}
