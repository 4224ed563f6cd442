// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Chunk Domain Types
//!
//! Value objects shared by every worker in a swarm:
//!
//! - [`JobId`]: caller-assigned grouping key; a job has no record of its own.
//! - [`ChunkId`]: store-assigned, monotonically increasing identifier.
//! - [`WorkerId`] / [`WorkerIdentity`]: scheduler task index plus display name.
//! - [`ChunkStatus`]: lifecycle state, persisted as a small integer code.
//! - [`Chunk`]: the unit of work handed to a worker.
//! - [`JobSummary`]: per-status counts for one job.
//!
//! # Lifecycle
//!
//! ```text
//! Available ──claim──▶ Running ──mark_done──▶ Done
//!                         │
//!                         └──operator──▶ Error
//! ```
//!
//! A worker that dies while holding a chunk leaves it `Running`. There is no
//! lease or heartbeat; an operator requeues it explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rejection of a raw identifier at the queue boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} is missing")]
    Missing { kind: &'static str },

    #[error("{kind} must be an integer, got '{value}'")]
    NotAnInteger { kind: &'static str, value: String },

    #[error("{kind} must not be negative, got {value}")]
    Negative { kind: &'static str, value: i64 },

    #[error("{kind} must be greater than zero, got {value}")]
    NotPositive { kind: &'static str, value: i64 },
}

fn parse_id(kind: &'static str, raw: &str) -> Result<i64, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Missing { kind });
    }
    trimmed.parse::<i64>().map_err(|_| IdError::NotAnInteger {
        kind,
        value: trimmed.to_string(),
    })
}

/// Identifier of a job. Chosen by whoever creates the chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn validate(&self) -> Result<(), IdError> {
        if self.0 < 0 {
            return Err(IdError::Negative { kind: "job id", value: self.0 });
        }
        Ok(())
    }
}

impl FromStr for JobId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = JobId(parse_id("job id", s)?);
        id.validate()?;
        Ok(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a chunk row. Assigned by the store, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub i64);

impl ChunkId {
    pub fn validate(&self) -> Result<(), IdError> {
        if self.0 <= 0 {
            return Err(IdError::NotPositive { kind: "chunk id", value: self.0 });
        }
        Ok(())
    }
}

impl FromStr for ChunkId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ChunkId(parse_id("chunk id", s)?);
        id.validate()?;
        Ok(id)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduler-assigned task index of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub i64);

impl WorkerId {
    pub fn validate(&self) -> Result<(), IdError> {
        if self.0 < 0 {
            return Err(IdError::Negative { kind: "worker id", value: self.0 });
        }
        Ok(())
    }
}

impl FromStr for WorkerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = WorkerId(parse_id("worker id", s)?);
        id.validate()?;
        Ok(id)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity stamped onto every chunk a worker claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub worker_id: WorkerId,
    pub worker_name: Option<String>,
}

impl WorkerIdentity {
    pub fn new(worker_id: WorkerId, worker_name: Option<String>) -> Self {
        Self { worker_id, worker_name }
    }

    /// Conventional `<host>-<task>` name used when none is given.
    pub fn host_slot_name(host: &str, worker_id: WorkerId) -> String {
        format!("{}-{}", host, worker_id)
    }
}

/// Chunk lifecycle state.
///
/// Persisted as `0=Available, 1=Running, 2=Done, -1=Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Available,
    Running,
    Done,
    Error,
}

impl ChunkStatus {
    pub fn code(self) -> i16 {
        match self {
            ChunkStatus::Available => 0,
            ChunkStatus::Running => 1,
            ChunkStatus::Done => 2,
            ChunkStatus::Error => -1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(ChunkStatus::Available),
            1 => Some(ChunkStatus::Running),
            2 => Some(ChunkStatus::Done),
            -1 => Some(ChunkStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkStatus::Available => write!(f, "available"),
            ChunkStatus::Running => write!(f, "running"),
            ChunkStatus::Done => write!(f, "done"),
            ChunkStatus::Error => write!(f, "error"),
        }
    }
}

/// A unit of work belonging to a job.
///
/// `payload` is opaque to the queue; its meaning is defined by the worker
/// command that processes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub job_id: JobId,
    pub status: ChunkStatus,
    pub worker_id: Option<WorkerId>,
    pub worker_name: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Chunk {
    /// True when `worker` currently holds this chunk for `job_id`.
    pub fn is_held_by(&self, worker: WorkerId, job_id: JobId) -> bool {
        self.status == ChunkStatus::Running
            && self.worker_id == Some(worker)
            && self.job_id == job_id
    }
}

/// Per-status chunk counts for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub available: u64,
    pub running: u64,
    pub done: u64,
    pub error: u64,
}

impl JobSummary {
    pub fn empty(job_id: JobId) -> Self {
        Self { job_id, ..Default::default() }
    }

    pub fn record(&mut self, status: ChunkStatus, count: u64) {
        match status {
            ChunkStatus::Available => self.available += count,
            ChunkStatus::Running => self.running += count,
            ChunkStatus::Done => self.done += count,
            ChunkStatus::Error => self.error += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.available + self.running + self.done + self.error
    }

    /// Nothing left to claim.
    pub fn is_exhausted(&self) -> bool {
        self.available == 0
    }
}
