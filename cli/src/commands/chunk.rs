// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Single chunk operations for worker scripts
//!
//! Commands: request, complete
//!
//! Exit codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | chunk claimed / completed |
//! | 1 | completion refused: chunk not held by this worker |
//! | 3 | no chunk available: the job is exhausted |

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use chunkswarm_core::domain::chunk::{ChunkId, JobId, WorkerId};

use super::{load_config, queue_client};

pub const EXIT_MISMATCH: i32 = 1;
pub const EXIT_EXHAUSTED: i32 = 3;

#[derive(Subcommand)]
pub enum ChunkCommand {
    /// Claim the next chunk of a job and print it as JSON
    Request {
        #[arg(long)]
        worker_id: WorkerId,

        #[arg(long)]
        job_id: JobId,

        #[arg(long)]
        worker_name: Option<String>,

        /// Claim up to N chunks; prints a JSON array
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },

    /// Mark a claimed chunk as done
    Complete {
        #[arg(long)]
        worker_id: WorkerId,

        #[arg(long)]
        job_id: JobId,

        #[arg(long)]
        chunk_id: ChunkId,
    },
}

pub async fn handle_command(command: ChunkCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let queue = queue_client(&config).await?;

    match command {
        ChunkCommand::Request {
            worker_id,
            job_id,
            worker_name,
            count: None,
        } => match queue.request_chunk(worker_id, job_id, worker_name.as_deref()).await? {
            Some(chunk) => println!("{}", serde_json::to_string(&chunk)?),
            None => std::process::exit(EXIT_EXHAUSTED),
        },
        ChunkCommand::Request {
            worker_id,
            job_id,
            worker_name,
            count: Some(n),
        } => {
            let chunks = queue
                .request_chunks(worker_id, job_id, worker_name.as_deref(), n)
                .await?;
            if chunks.is_empty() {
                std::process::exit(EXIT_EXHAUSTED);
            }
            println!("{}", serde_json::to_string(&chunks)?);
        }
        ChunkCommand::Complete {
            worker_id,
            job_id,
            chunk_id,
        } => {
            if !queue.complete_chunk(worker_id, job_id, chunk_id).await? {
                eprintln!("Chunk {} is not held by worker {} in job {}", chunk_id, worker_id, job_id);
                std::process::exit(EXIT_MISMATCH);
            }
        }
    }

    Ok(())
}
