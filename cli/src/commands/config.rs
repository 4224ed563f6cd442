// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use chunkswarm_core::domain::repository::StorageBackend;
use chunkswarm_core::domain::swarm_config::SwarmConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./chunkswarm.yaml)
        #[arg(short, long, default_value = "./chunkswarm.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SwarmConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. CHUNKSWARM_CONFIG_PATH: {}",
            std::env::var("CHUNKSWARM_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./chunkswarm.yaml");
        println!("  4. ~/.chunkswarm/config.yaml");
        println!("  5. /etc/chunkswarm/config.yaml");
        println!();
    }

    println!("{}", format!("Current configuration ({}):", config.metadata.name).bold());
    println!();

    println!("{}", "Chunk store:".bold());
    match config.storage_backend()? {
        StorageBackend::InMemory => println!("  Backend: in-memory (single process)"),
        StorageBackend::PostgreSQL(pg) => {
            println!("  Backend: postgres");
            if pg.connection_string.is_some() {
                println!("  Connection: {}", "(connection string set)".dimmed());
            } else {
                println!("  Host: {}:{}", pg.host, pg.port);
                println!("  User: {}", pg.user.as_deref().unwrap_or("(default)"));
                println!("  Database: {}", pg.database.as_deref().unwrap_or("(default)"));
                println!(
                    "  Password: {}",
                    if pg.password.is_some() { "********" } else { "(none)" }
                );
            }
            if let Some(profile) = &config.spec.store.profile {
                println!("  Profile: {}", profile);
            }
            println!("  Max connections: {}", pg.max_connections);
        }
    }
    println!();

    let sizing = &config.spec.sizing;
    println!("{}", "Sizing:".bold());
    println!("  CPUs to leave: {}", sizing.cpus_to_leave);
    println!("  Availability divisor: {}", sizing.availability_divisor);
    println!("  Worker script: {}", sizing.worker_script.display());
    println!("  Grow every: {} chunks", sizing.grow_every);
    println!("  Probe timeout: {}s", sizing.probe_timeout_secs);
    println!();

    let scheduler = &config.spec.scheduler;
    println!("{}", "Scheduler:".bold());
    println!("  Kind: {}", scheduler.kind);
    println!("  Queue: {}", scheduler.queue);
    println!("  User: {}", scheduler.user.as_deref().unwrap_or("($USER)"));
    println!("  Command timeout: {}s", scheduler.command_timeout_secs);
    println!();

    println!("{}", "Worker:".bold());
    println!(
        "  Command: {}",
        config.spec.worker.command.as_deref().unwrap_or("(not set)")
    );
    if let Some(timeout) = config.spec.worker.chunk_timeout_secs {
        println!("  Chunk timeout: {}s", timeout);
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SwarmConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    std::fs::write(&output, template(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn template(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse_and_validate() {
        for with_examples in [false, true] {
            let config = SwarmConfigManifest::from_yaml_str(template(with_examples)).unwrap();
            config.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("chunkswarm.yaml");
        generate(output.clone(), false).await.unwrap();

        let config = SwarmConfigManifest::from_yaml_file(&output).unwrap();
        assert_eq!(config.kind, "SwarmConfig");
    }
}
