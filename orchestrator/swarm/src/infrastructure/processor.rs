// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shell command chunk processor
//!
//! Runs the configured command through `sh -c` once per chunk. The command
//! sees the chunk through the environment:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `CHUNKSWARM_JOB_ID` | job id |
//! | `CHUNKSWARM_CHUNK_ID` | chunk id |
//! | `CHUNKSWARM_WORKER_ID` | worker id |
//! | `CHUNKSWARM_WORKER_NAME` | worker name, empty when unset |
//! | `CHUNKSWARM_PAYLOAD` | chunk payload |
//!
//! Exit status 0 means the chunk is done.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use chunkswarm_core::domain::chunk::{Chunk, WorkerIdentity};

use crate::domain::processor::{ChunkProcessor, ProcessError};

#[derive(Debug, Clone)]
pub struct ScriptChunkProcessor {
    command: String,
    timeout: Option<Duration>,
}

impl ScriptChunkProcessor {
    pub fn new(command: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChunkProcessor for ScriptChunkProcessor {
    async fn process(&self, chunk: &Chunk, worker: &WorkerIdentity) -> Result<(), ProcessError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("CHUNKSWARM_JOB_ID", chunk.job_id.to_string())
            .env("CHUNKSWARM_CHUNK_ID", chunk.id.to_string())
            .env("CHUNKSWARM_WORKER_ID", worker.worker_id.to_string())
            .env("CHUNKSWARM_WORKER_NAME", worker.worker_name.as_deref().unwrap_or(""))
            .env("CHUNKSWARM_PAYLOAD", &chunk.payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::Spawn(e.to_string()))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProcessError::Timeout(limit.as_secs()))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| ProcessError::Spawn(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(chunk_id = %chunk.id, output = %stdout.trim(), "Chunk command output");
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(ProcessError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
