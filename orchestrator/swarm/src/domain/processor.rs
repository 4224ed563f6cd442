// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chunk processing port.

use async_trait::async_trait;
use thiserror::Error;

use chunkswarm_core::domain::chunk::{Chunk, WorkerIdentity};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start chunk command: {0}")]
    Spawn(String),

    #[error("Chunk command exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Chunk command did not finish within {0}s")]
    Timeout(u64),
}

/// Does the actual work for one claimed chunk. Runs entirely locally; the
/// queue is not touched until it returns.
#[async_trait]
pub trait ChunkProcessor: Send + Sync {
    async fn process(&self, chunk: &Chunk, worker: &WorkerIdentity) -> Result<(), ProcessError>;
}
