// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Scheduler Factory - Application Layer
//!
//! Creates the [`BatchScheduler`] adapter named by the configuration.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

use chunkswarm_core::domain::swarm_config::{SchedulerConfig, SchedulerKind};

use crate::domain::scheduler::BatchScheduler;
use crate::infrastructure::command::{CommandRunner, TokioCommandRunner};
use crate::infrastructure::grid_engine::GridEngineScheduler;
use crate::infrastructure::slurm::SlurmScheduler;

/// Creates a BatchScheduler implementation based on the configured kind.
///
/// The scheduler user defaults to `$USER`, then `$LOGNAME`.
pub fn create_scheduler(config: &SchedulerConfig) -> Result<Arc<dyn BatchScheduler>> {
    let runner: Arc<dyn CommandRunner> =
        Arc::new(TokioCommandRunner::new(Duration::from_secs(config.command_timeout_secs)));
    create_scheduler_with_runner(config, runner, |key| std::env::var(key).ok())
}

pub fn create_scheduler_with_runner<F>(
    config: &SchedulerConfig,
    runner: Arc<dyn CommandRunner>,
    lookup: F,
) -> Result<Arc<dyn BatchScheduler>>
where
    F: Fn(&str) -> Option<String>,
{
    let user = match config.user.clone().or_else(|| lookup("USER")).or_else(|| lookup("LOGNAME")) {
        Some(user) if !user.trim().is_empty() => user,
        _ => bail!("Scheduler user is not configured and neither USER nor LOGNAME is set"),
    };

    let scheduler: Arc<dyn BatchScheduler> = match config.kind {
        SchedulerKind::GridEngine => Arc::new(GridEngineScheduler::new(runner, config.queue.clone(), user)),
        SchedulerKind::Slurm => Arc::new(SlurmScheduler::new(runner, config.queue.clone(), user)),
    };
    Ok(scheduler)
}
