// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Slurm adapter
//!
//! | Reading | Command |
//! |---------|---------|
//! | partition capacity | `sinfo -h -p <partition> -o %C` (idle CPUs) |
//! | user slots | `squeue -h -r -u <user> -t PENDING,RUNNING -o %C` |
//! | submission | `sbatch --parsable --array=<start>-<end> -p <partition> <script>` |
//!
//! `squeue -r` prints one line per array element, so pending arrays need no
//! range expansion here. Each task sees its index as `SLURM_ARRAY_TASK_ID`.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use crate::domain::capacity::WorkerRange;
use crate::domain::scheduler::{BatchScheduler, SchedulerError};
use crate::infrastructure::command::{run_checked, CommandRunner};

// allocated/idle/other/total
static CPU_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)/(\d+)/(\d+)$").expect("valid regex"));

pub struct SlurmScheduler {
    runner: Arc<dyn CommandRunner>,
    partition: String,
    user: String,
}

impl SlurmScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, partition: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            runner,
            partition: partition.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
impl BatchScheduler for SlurmScheduler {
    fn name(&self) -> &'static str {
        "slurm"
    }

    async fn queue_available_slots(&self) -> Result<u64, SchedulerError> {
        let args = vec![
            "-h".to_string(),
            "-p".to_string(),
            self.partition.clone(),
            "-o".to_string(),
            "%C".to_string(),
        ];
        let output = run_checked(self.runner.as_ref(), "sinfo", &args).await?;
        parse_idle_cpus(&output.stdout)
    }

    async fn user_slots_in_use(&self) -> Result<u64, SchedulerError> {
        let args = vec![
            "-h".to_string(),
            "-r".to_string(),
            "-u".to_string(),
            self.user.clone(),
            "-t".to_string(),
            "PENDING,RUNNING".to_string(),
            "-o".to_string(),
            "%C".to_string(),
        ];
        let output = run_checked(self.runner.as_ref(), "squeue", &args).await?;
        parse_cpu_counts(&output.stdout)
    }

    async fn submit_workers(&self, range: WorkerRange, script: &Path) -> Result<(), SchedulerError> {
        let args = vec![
            "--parsable".to_string(),
            format!("--array={}", range),
            "-p".to_string(),
            self.partition.clone(),
            script.display().to_string(),
        ];
        let output = run_checked(self.runner.as_ref(), "sbatch", &args).await?;
        tracing::info!(range = %range, job = %output.stdout.trim(), "sbatch accepted workers");
        Ok(())
    }
}

/// Idle CPUs summed over every `%C` line `sinfo` prints for the partition.
pub fn parse_idle_cpus(output: &str) -> Result<u64, SchedulerError> {
    let mut idle = 0u64;
    let mut seen = false;

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let caps = CPU_STATE
            .captures(line)
            .ok_or_else(|| SchedulerError::Parse(format!("unexpected sinfo %C line '{}'", line)))?;
        idle = caps[2]
            .parse::<u64>()
            .ok()
            .and_then(|n| idle.checked_add(n))
            .ok_or_else(|| SchedulerError::Parse(format!("idle CPUs out of range in '{}'", line)))?;
        seen = true;
    }

    if !seen {
        return Err(SchedulerError::Parse("sinfo reported no CPUs for the partition".to_string()));
    }
    Ok(idle)
}

/// Sum of one CPU count per line.
pub fn parse_cpu_counts(output: &str) -> Result<u64, SchedulerError> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .try_fold(0u64, |total, l| {
            let cpus = l
                .parse::<u64>()
                .map_err(|_| SchedulerError::Parse(format!("unexpected squeue %C line '{}'", l)))?;
            total
                .checked_add(cpus)
                .ok_or_else(|| SchedulerError::Parse("squeue CPU total overflows".to_string()))
        })
}
