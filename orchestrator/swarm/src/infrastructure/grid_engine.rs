// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Grid Engine adapter
//!
//! | Reading | Command |
//! |---------|---------|
//! | queue capacity | `qstat -g c` (AVAIL column of the configured cluster queue) |
//! | user slots | `qstat -u <user>` (slots x array tasks, summed over every entry) |
//! | submission | `qsub -t <start>-<end> -q <queue> <script>` |
//!
//! Each submitted task sees its index as `SGE_TASK_ID`.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use crate::domain::capacity::WorkerRange;
use crate::domain::scheduler::{BatchScheduler, SchedulerError};
use crate::infrastructure::command::{run_checked, CommandRunner};

static TASK_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+)(?::(\d+))?)?$").expect("valid regex"));

pub struct GridEngineScheduler {
    runner: Arc<dyn CommandRunner>,
    queue: String,
    user: String,
}

impl GridEngineScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, queue: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            runner,
            queue: queue.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
impl BatchScheduler for GridEngineScheduler {
    fn name(&self) -> &'static str {
        "grid_engine"
    }

    async fn queue_available_slots(&self) -> Result<u64, SchedulerError> {
        let args = vec!["-g".to_string(), "c".to_string()];
        let output = run_checked(self.runner.as_ref(), "qstat", &args).await?;
        parse_cluster_queue_avail(&output.stdout, &self.queue)
    }

    async fn user_slots_in_use(&self) -> Result<u64, SchedulerError> {
        let args = vec!["-u".to_string(), self.user.clone()];
        let output = run_checked(self.runner.as_ref(), "qstat", &args).await?;
        parse_user_slots(&output.stdout)
    }

    async fn submit_workers(&self, range: WorkerRange, script: &Path) -> Result<(), SchedulerError> {
        let args = vec![
            "-t".to_string(),
            range.to_string(),
            "-q".to_string(),
            self.queue.clone(),
            script.display().to_string(),
        ];
        let output = run_checked(self.runner.as_ref(), "qsub", &args).await?;
        tracing::info!(range = %range, response = %output.stdout.trim(), "qsub accepted workers");
        Ok(())
    }
}

/// AVAIL of `queue` from `qstat -g c`. Columns are located by header name,
/// so the optional RES column of newer releases does not shift the result.
pub fn parse_cluster_queue_avail(output: &str, queue: &str) -> Result<u64, SchedulerError> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| SchedulerError::Parse("empty qstat -g c output".to_string()))?
        .replace("CLUSTER QUEUE", "CLUSTER_QUEUE");
    let columns: Vec<&str> = header.split_whitespace().collect();
    let avail_idx = columns
        .iter()
        .position(|c| *c == "AVAIL")
        .ok_or_else(|| SchedulerError::Parse("qstat -g c header has no AVAIL column".to_string()))?;

    for line in lines.filter(|l| !l.starts_with('-')) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&queue) {
            continue;
        }
        let raw = fields
            .get(avail_idx)
            .ok_or_else(|| SchedulerError::Parse(format!("short row for queue {}: '{}'", queue, line)))?;
        return raw
            .parse::<u64>()
            .map_err(|_| SchedulerError::Parse(format!("AVAIL for queue {} is '{}'", queue, raw)));
    }

    Err(SchedulerError::Parse(format!("queue {} not listed by qstat -g c", queue)))
}

/// Total slots of every job row in `qstat -u` output.
///
/// Rows are `job-ID prior name user state date time [queue] slots [ja-task-ID]`.
/// Pending rows have no queue; pending array rows carry a task range which is
/// expanded so each waiting task counts.
pub fn parse_user_slots(output: &str) -> Result<u64, SchedulerError> {
    let mut total = 0u64;

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0] == "job-ID" || fields[0].starts_with('-') {
            continue;
        }
        if fields.len() < 8 {
            return Err(SchedulerError::Parse(format!("short qstat row: '{}'", line)));
        }

        let mut rest = &fields[7..];
        if rest.first().is_some_and(|f| f.parse::<u64>().is_err()) {
            rest = &rest[1..];
        }

        let slots = rest
            .first()
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(|| SchedulerError::Parse(format!("no slot count in qstat row: '{}'", line)))?;
        let tasks = match rest.get(1) {
            Some(spec) => count_array_tasks(spec)?,
            None => 1,
        };

        total = slots
            .checked_mul(tasks)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| SchedulerError::Parse(format!("slot total overflows in qstat row: '{}'", line)))?;
    }

    Ok(total)
}

/// Number of tasks in a Grid Engine task list such as `7`, `4-20:1` or `1-9:2,15`.
pub fn count_array_tasks(spec: &str) -> Result<u64, SchedulerError> {
    let mut count = 0u64;

    for part in spec.split(',') {
        let caps = TASK_RANGE
            .captures(part)
            .ok_or_else(|| SchedulerError::Parse(format!("bad array task spec '{}'", spec)))?;
        let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

        let start = number(1).ok_or_else(|| SchedulerError::Parse(format!("bad array task spec '{}'", spec)))?;
        let tasks = match number(2) {
            None => 1,
            Some(end) if end < start => {
                return Err(SchedulerError::Parse(format!("descending array task range '{}'", part)))
            }
            Some(end) => {
                let step = number(3).unwrap_or(1).max(1);
                ((end - start) / step)
                    .checked_add(1)
                    .ok_or_else(|| SchedulerError::Parse(format!("array task count overflows in '{}'", spec)))?
            }
        };
        count = count
            .checked_add(tasks)
            .ok_or_else(|| SchedulerError::Parse(format!("array task count overflows in '{}'", spec)))?;
    }

    Ok(count)
}
