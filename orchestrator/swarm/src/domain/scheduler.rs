// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Batch Scheduler Port
//!
//! The swarm never talks to a cluster directly. Capacity readings and worker
//! submissions go through [`BatchScheduler`]; adapters for concrete schedulers
//! live in `crate::infrastructure::grid_engine` and `crate::infrastructure::slurm`.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::capacity::WorkerRange;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to run '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("'{command}' exited with status {status:?}: {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' did not finish within {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Unexpected scheduler output: {0}")]
    Parse(String),
}

/// External batch scheduler used to size the swarm.
///
/// Both readings are point-in-time and may be stale by the time a submission
/// is made.
#[async_trait]
pub trait BatchScheduler: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &'static str;

    /// Free slots in the queue or partition the swarm submits to.
    async fn queue_available_slots(&self) -> Result<u64, SchedulerError>;

    /// Slots held by the current user's running and pending tasks, summed
    /// across every entry the scheduler reports for that user.
    async fn user_slots_in_use(&self) -> Result<u64, SchedulerError>;

    /// Request one worker per index in `range`, each running `script`.
    /// Returns once the scheduler accepted the request.
    async fn submit_workers(&self, range: WorkerRange, script: &Path) -> Result<(), SchedulerError>;
}
