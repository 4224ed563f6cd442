// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Job commands
//!
//! Commands: create, reset, status, requeue, fail
//!
//! `requeue` and `fail` are the operator's tools for chunks left Running by a
//! worker that died or failed. Nothing calls them automatically.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use chunkswarm_core::domain::chunk::{ChunkId, JobId};

use super::{load_config, queue_client};

#[derive(Subcommand)]
pub enum JobCommand {
    /// Create chunks for a job
    Create {
        #[arg(value_name = "JOB_ID")]
        job_id: JobId,

        /// Chunk payload (repeatable)
        #[arg(short, long = "payload", value_name = "PAYLOAD")]
        payloads: Vec<String>,

        /// Read one payload per non-empty line
        #[arg(long, value_name = "FILE")]
        from_file: Option<PathBuf>,

        /// Inclusive integer range of payloads, e.g. 1..50
        #[arg(long, value_name = "START..END")]
        range: Option<String>,

        /// Delete existing chunks of the job first
        #[arg(long)]
        reset: bool,
    },

    /// Delete every chunk of a job
    Reset {
        #[arg(value_name = "JOB_ID")]
        job_id: JobId,
    },

    /// Show per-status chunk counts
    Status {
        #[arg(value_name = "JOB_ID")]
        job_id: JobId,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Return a stuck Running chunk to Available
    Requeue {
        #[arg(value_name = "CHUNK_ID")]
        chunk_id: ChunkId,
    },

    /// Mark a Running chunk as Error
    Fail {
        #[arg(value_name = "CHUNK_ID")]
        chunk_id: ChunkId,
    },
}

pub async fn handle_command(command: JobCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let queue = queue_client(&config).await?;

    match command {
        JobCommand::Create {
            job_id,
            payloads,
            from_file,
            range,
            reset,
        } => {
            let payloads = collect_payloads(payloads, from_file.as_deref(), range.as_deref())?;
            if reset {
                let removed = queue.reset_job(job_id).await?;
                println!("Removed {} existing chunks of job {}", removed, job_id);
            }
            let ids = queue.create_chunks(job_id, &payloads).await?;
            match (ids.first(), ids.last()) {
                (Some(first), Some(last)) => println!(
                    "{}",
                    format!("✓ Created {} chunks for job {} (ids {}..{})", ids.len(), job_id, first, last).green()
                ),
                _ => println!("No chunks created"),
            }
        }
        JobCommand::Reset { job_id } => {
            let removed = queue.reset_job(job_id).await?;
            println!("{}", format!("✓ Removed {} chunks of job {}", removed, job_id).green());
        }
        JobCommand::Status { job_id, json } => {
            let summary = queue.job_summary(job_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", format!("Job {}", job_id).bold());
                println!("  available: {}", summary.available);
                println!("  running:   {}", summary.running);
                println!("  done:      {}", summary.done);
                println!("  error:     {}", summary.error);
                println!("  total:     {}", summary.total());
            }
        }
        JobCommand::Requeue { chunk_id } => {
            if queue.requeue_chunk(chunk_id).await? {
                println!("{}", format!("✓ Chunk {} is available again", chunk_id).green());
            } else {
                println!("{}", format!("Chunk {} is not running; nothing changed", chunk_id).yellow());
                std::process::exit(1);
            }
        }
        JobCommand::Fail { chunk_id } => {
            if queue.fail_chunk(chunk_id).await? {
                println!("{}", format!("✓ Chunk {} marked as error", chunk_id).green());
            } else {
                println!("{}", format!("Chunk {} is not running; nothing changed", chunk_id).yellow());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn collect_payloads(mut payloads: Vec<String>, from_file: Option<&Path>, range: Option<&str>) -> Result<Vec<String>> {
    if let Some(path) = from_file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payloads from {:?}", path))?;
        payloads.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }

    if let Some(range) = range {
        let (start, end) = parse_range(range)?;
        payloads.extend((start..=end).map(|i| i.to_string()));
    }

    if payloads.is_empty() {
        bail!("No payloads given; use --payload, --from-file or --range");
    }
    Ok(payloads)
}

fn parse_range(raw: &str) -> Result<(i64, i64)> {
    let (start, end) = raw
        .split_once("..")
        .with_context(|| format!("Range must look like START..END, got '{}'", raw))?;
    let start: i64 = start.trim().parse().with_context(|| format!("Bad range start in '{}'", raw))?;
    let end: i64 = end.trim().parse().with_context(|| format!("Bad range end in '{}'", raw))?;
    if end < start {
        bail!("Range end {} is before start {}", end, start);
    }
    Ok((start, end))
}
