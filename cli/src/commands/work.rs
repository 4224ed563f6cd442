// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Worker loop command
//!
//! Run by every worker the scheduler starts. The worker id defaults to the
//! scheduler's array task index (`SGE_TASK_ID`, then `SLURM_ARRAY_TASK_ID`)
//! and the worker name to `<hostname>-<worker id>`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chunkswarm_core::domain::chunk::{JobId, WorkerId, WorkerIdentity};
use chunkswarm_swarm::application::{create_scheduler, CapacityProbe, PrimeGrowth, SizingController, WorkerLoop};
use chunkswarm_swarm::domain::SizingPolicy;
use chunkswarm_swarm::infrastructure::shutdown::install_shutdown_handler;
use chunkswarm_swarm::infrastructure::ScriptChunkProcessor;

use super::{load_config, queue_client};

const TASK_ID_VARS: [&str; 2] = ["SGE_TASK_ID", "SLURM_ARRAY_TASK_ID"];

#[derive(Args)]
pub struct WorkCommand {
    #[arg(long)]
    job_id: JobId,

    /// Defaults to SGE_TASK_ID or SLURM_ARRAY_TASK_ID
    #[arg(long)]
    worker_id: Option<WorkerId>,

    /// Defaults to <hostname>-<worker id>
    #[arg(long)]
    worker_name: Option<String>,

    /// Also grow the swarm at startup and every `grow_every` chunks
    #[arg(long)]
    prime: bool,

    /// Shell command per chunk (overrides spec.worker.command)
    #[arg(long, value_name = "COMMAND")]
    command: Option<String>,

    /// Log growth decisions without submitting workers
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: WorkCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;

    let worker_id = resolve_worker_id(cmd.worker_id, |key| std::env::var(key).ok())?;
    let worker_name = cmd
        .worker_name
        .unwrap_or_else(|| WorkerIdentity::host_slot_name(&local_host_name(), worker_id));
    let identity = WorkerIdentity::new(worker_id, Some(worker_name));

    let Some(command) = cmd.command.or_else(|| config.spec.worker.command.clone()) else {
        bail!("No chunk command configured; set spec.worker.command or pass --command");
    };
    let processor = Arc::new(ScriptChunkProcessor::new(
        command,
        config.spec.worker.chunk_timeout_secs.map(Duration::from_secs),
    ));

    let queue = queue_client(&config).await?;
    let mut worker = WorkerLoop::new(queue, cmd.job_id, identity, processor).with_shutdown(install_shutdown_handler());

    if cmd.prime {
        let sizing = &config.spec.sizing;
        let scheduler = create_scheduler(&config.spec.scheduler)?;
        let probe = CapacityProbe::new(scheduler.clone(), Duration::from_secs(sizing.probe_timeout_secs));
        worker = worker.with_growth(PrimeGrowth {
            controller: SizingController::new(probe, scheduler).with_dry_run(cmd.dry_run),
            policy: SizingPolicy::from(sizing),
            worker_script: sizing.worker_script.clone(),
            grow_every: sizing.grow_every,
        });
    }

    let summary = worker.run().await.context("Worker loop failed")?;

    println!(
        "{}",
        format!(
            "Worker {} finished job {}: {} completed, {} mismatched, {} failed",
            worker_id, cmd.job_id, summary.completed, summary.mismatched, summary.failed
        )
        .bold()
    );
    if summary.workers_requested > 0 {
        println!("Requested {} additional workers", summary.workers_requested);
    }
    Ok(())
}

fn resolve_worker_id<F>(explicit: Option<WorkerId>, lookup: F) -> Result<WorkerId>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(id) = explicit {
        return Ok(id);
    }

    for var in TASK_ID_VARS {
        // Grid Engine sets "undefined" for non-array jobs
        match lookup(var) {
            Some(raw) if !raw.trim().is_empty() && raw.trim() != "undefined" => {
                return raw
                    .parse::<WorkerId>()
                    .with_context(|| format!("{} is not a valid worker id", var));
            }
            _ => continue,
        }
    }

    bail!("No --worker-id given and neither SGE_TASK_ID nor SLURM_ARRAY_TASK_ID is set")
}

fn local_host_name() -> String {
    let name = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()))
        .unwrap_or_else(|| "localhost".to_string());
    short_host_name(&name)
}

/// First label of a host name, matching what schedulers print.
fn short_host_name(name: &str) -> String {
    match name.split('.').next() {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => "localhost".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_worker_id_wins() {
        let id = resolve_worker_id(Some(WorkerId(4)), env(&[("SGE_TASK_ID", "9")])).unwrap();
        assert_eq!(id, WorkerId(4));
    }

    #[test]
    fn test_grid_engine_task_id() {
        let id = resolve_worker_id(None, env(&[("SGE_TASK_ID", "12")])).unwrap();
        assert_eq!(id, WorkerId(12));
    }

    #[test]
    fn test_undefined_sge_task_falls_through_to_slurm() {
        let lookup = env(&[("SGE_TASK_ID", "undefined"), ("SLURM_ARRAY_TASK_ID", "3")]);
        assert_eq!(resolve_worker_id(None, lookup).unwrap(), WorkerId(3));
    }

    #[test]
    fn test_missing_or_bad_task_id() {
        assert!(resolve_worker_id(None, env(&[])).is_err());
        assert!(resolve_worker_id(None, env(&[("SGE_TASK_ID", "abc")])).is_err());
    }

    #[test]
    fn test_hostname_is_short_and_not_empty() {
        let name = local_host_name();
        assert!(!name.is_empty());
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_short_host_name() {
        assert_eq!(short_host_name("node07.cluster.example.org"), "node07");
        assert_eq!(short_host_name("node07"), "node07");
        assert_eq!(short_host_name(""), "localhost");
        assert_eq!(short_host_name(".example.org"), "localhost");
    }
}
