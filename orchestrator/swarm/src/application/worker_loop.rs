// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Worker Loop
//!
//! Claims, processes and completes chunks of one job until the job has no
//! Available chunks left or a stop is requested.
//!
//! The prime worker also grows the swarm: once before its first claim and
//! again after every `grow_every` completed chunks. Growth problems are logged
//! and never stop chunk processing.
//!
//! A chunk whose processing fails stays Running under this worker. Nothing
//! requeues it automatically; an operator decides with `job requeue` or
//! `job fail`.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use chunkswarm_core::application::queue_client::{QueueClient, QueueError};
use chunkswarm_core::domain::chunk::{JobId, WorkerIdentity};

use crate::application::sizing_controller::SizingController;
use crate::domain::capacity::SizingPolicy;
use crate::domain::processor::ChunkProcessor;

#[derive(Debug, Error)]
pub enum WorkerLoopError {
    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),
}

/// Growth settings carried by the prime worker.
#[derive(Clone)]
pub struct PrimeGrowth {
    pub controller: SizingController,
    pub policy: SizingPolicy,
    pub worker_script: PathBuf,
    /// Completed chunks between growth evaluations. 0 means startup only.
    pub grow_every: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub claimed: u64,
    pub completed: u64,
    /// Completions the store refused because the chunk was no longer held
    pub mismatched: u64,
    /// Chunks whose processing failed; left Running
    pub failed: u64,
    pub growth_cycles: u64,
    pub workers_requested: u64,
    pub stopped_early: bool,
}

pub struct WorkerLoop {
    queue: QueueClient,
    job_id: JobId,
    identity: WorkerIdentity,
    processor: Arc<dyn ChunkProcessor>,
    growth: Option<PrimeGrowth>,
    shutdown: CancellationToken,
}

impl WorkerLoop {
    pub fn new(
        queue: QueueClient,
        job_id: JobId,
        identity: WorkerIdentity,
        processor: Arc<dyn ChunkProcessor>,
    ) -> Self {
        Self {
            queue,
            job_id,
            identity,
            processor,
            growth: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Make this the prime worker.
    pub fn with_growth(mut self, growth: PrimeGrowth) -> Self {
        self.growth = Some(growth);
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(&self) -> Result<WorkerSummary, WorkerLoopError> {
        let mut summary = WorkerSummary::default();
        let worker_id = self.identity.worker_id;
        let worker_name = self.identity.worker_name.as_deref();

        info!(
            job_id = %self.job_id,
            worker_id = %worker_id,
            worker_name = worker_name.unwrap_or("-"),
            prime = self.growth.is_some(),
            "Worker starting"
        );

        self.grow(&mut summary).await;

        loop {
            if self.shutdown.is_cancelled() {
                summary.stopped_early = true;
                info!(job_id = %self.job_id, worker_id = %worker_id, "Stop requested; not claiming more chunks");
                break;
            }

            let Some(chunk) = self.queue.request_chunk(worker_id, self.job_id, worker_name).await? else {
                break;
            };
            summary.claimed += 1;
            info!(job_id = %self.job_id, chunk_id = %chunk.id, payload = %chunk.payload, "Processing chunk");

            if let Err(e) = self.processor.process(&chunk, &self.identity).await {
                summary.failed += 1;
                error!(
                    job_id = %self.job_id,
                    chunk_id = %chunk.id,
                    error = %e,
                    "Chunk processing failed; chunk left running for operator review"
                );
                continue;
            }

            if self.queue.complete_chunk(worker_id, self.job_id, chunk.id).await? {
                summary.completed += 1;
                info!(job_id = %self.job_id, chunk_id = %chunk.id, completed = summary.completed, "Chunk done");

                if self.growth_due(summary.completed) {
                    self.grow(&mut summary).await;
                }
            } else {
                summary.mismatched += 1;
            }
        }

        info!(
            job_id = %self.job_id,
            worker_id = %worker_id,
            claimed = summary.claimed,
            completed = summary.completed,
            mismatched = summary.mismatched,
            failed = summary.failed,
            workers_requested = summary.workers_requested,
            "Worker finished"
        );
        Ok(summary)
    }

    fn growth_due(&self, completed: u64) -> bool {
        match &self.growth {
            Some(growth) if growth.grow_every > 0 => completed > 0 && completed % growth.grow_every == 0,
            _ => false,
        }
    }

    async fn grow(&self, summary: &mut WorkerSummary) {
        let Some(growth) = &self.growth else {
            return;
        };
        summary.growth_cycles += 1;

        match growth.controller.consider_growth(growth.policy, &growth.worker_script).await {
            Ok(report) => summary.workers_requested += report.workers_requested(),
            Err(e) => {
                metrics::counter!("chunkswarm_submission_failures_total").increment(1);
                warn!(error = %e, "Worker submission failed; continuing with current swarm");
            }
        }
    }
}
