// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Swarm sizing commands
//!
//! Commands: probe, grow

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use chunkswarm_swarm::application::{create_scheduler, CapacityProbe, GrowthReport, SizingController};
use chunkswarm_swarm::domain::{GrowthDecision, SizingPolicy};

use super::load_config;

#[derive(Subcommand)]
pub enum SwarmCommand {
    /// Read current capacity and show what a growth cycle would decide
    Probe {
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one growth cycle
    Grow {
        /// Decide and log without submitting workers
        #[arg(long)]
        dry_run: bool,

        /// Script the new workers run (overrides spec.sizing.worker_script)
        #[arg(long, value_name = "FILE")]
        worker_script: Option<PathBuf>,
    },
}

pub async fn handle_command(command: SwarmCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let sizing = &config.spec.sizing;
    let policy = SizingPolicy::from(sizing);

    let scheduler = create_scheduler(&config.spec.scheduler)?;
    let probe = CapacityProbe::new(scheduler.clone(), Duration::from_secs(sizing.probe_timeout_secs));

    match command {
        SwarmCommand::Probe { json } => {
            let snapshot = probe.probe().await.context("Capacity probe failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&GrowthDecision::evaluate(policy, snapshot))?);
                return Ok(());
            }
            println!("{}", format!("Scheduler: {}", scheduler.name()).bold());
            println!("  queue:                 {}", config.spec.scheduler.queue);
            println!("  available slots:       {}", snapshot.total_available_slots);
            println!("  slots in use by user:  {}", snapshot.slots_in_use_by_user);
            println!();
            println!("{}", GrowthDecision::evaluate(policy, snapshot));
        }
        SwarmCommand::Grow { dry_run, worker_script } => {
            let script = worker_script.unwrap_or_else(|| sizing.worker_script.clone());
            let controller = SizingController::new(probe, scheduler).with_dry_run(dry_run);

            match controller.consider_growth(policy, &script).await? {
                GrowthReport::ProbeFailed(reason) => {
                    println!("{}", format!("Capacity probe failed, no growth: {}", reason).yellow());
                }
                GrowthReport::NoGrowth(decision) => println!("{}", decision),
                GrowthReport::DryRun(decision) => {
                    println!("{}", decision);
                    println!("{}", "Dry run: nothing submitted".yellow());
                }
                GrowthReport::Submitted(decision) => {
                    println!("{}", decision);
                    println!("{}", format!("✓ Submitted {} workers", decision.new_workers).green());
                }
            }
        }
    }

    Ok(())
}
