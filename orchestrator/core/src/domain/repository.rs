// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Chunk Store Contract
//!
//! Persistence contract for chunk records. The trait lives in the domain layer;
//! implementations live in `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `ChunkStore` | `Chunk` | `InMemoryChunkStore`, `PostgresChunkStore` |
//!
//! ## Atomicity
//!
//! `claim_next_chunk` and `mark_done` are each a single atomic
//! read-modify-write inside the store. Implementations must never split a
//! claim into an unlocked read followed by a separate write: every worker in
//! every process relies on the store alone to decide who holds a chunk.
//!
//! `delete_job_chunks` is deliberately *not* coordinated with in-flight
//! claims. Callers reset a job only when no worker references it.

use async_trait::async_trait;
use crate::domain::chunk::{Chunk, ChunkId, JobId, JobSummary, WorkerId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

/// Resolved PostgreSQL connection parameters.
///
/// `connection_string`, when present, is used as the base and the discrete
/// fields are ignored.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub max_connections: u32,
}

/// Shared chunk table used by every worker of every job.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Append one `Available` chunk per payload. Returns the assigned ids in
    /// payload order.
    async fn create_chunks(&self, job_id: JobId, payloads: &[String]) -> Result<Vec<ChunkId>, RepositoryError>;

    /// Atomically claim the lowest-id `Available` chunk of `job_id`, stamping
    /// it `Running` with the worker's identity and the claim time.
    ///
    /// Returns `None`, with no side effects, when the job has nothing left.
    async fn claim_next_chunk(
        &self,
        job_id: JobId,
        worker_id: WorkerId,
        worker_name: Option<&str>,
    ) -> Result<Option<ChunkId>, RepositoryError>;

    /// Mark a chunk `Done` only if it is `Running`, held by `worker_id` and
    /// belongs to `job_id`. True iff exactly one record changed.
    async fn mark_done(&self, worker_id: WorkerId, job_id: JobId, chunk_id: ChunkId) -> Result<bool, RepositoryError>;

    /// Remove every chunk of `job_id`. Returns the number removed.
    async fn delete_job_chunks(&self, job_id: JobId) -> Result<u64, RepositoryError>;

    /// Find chunk by ID
    async fn find_by_id(&self, chunk_id: ChunkId) -> Result<Option<Chunk>, RepositoryError>;

    /// Per-status counts for a job
    async fn job_summary(&self, job_id: JobId) -> Result<JobSummary, RepositoryError>;

    /// Operator recovery: return a stuck `Running` chunk to `Available` and
    /// clear its worker fields. True iff the chunk was `Running`.
    async fn requeue_chunk(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError>;

    /// Operator action: move a `Running` chunk to `Error`. True iff the chunk
    /// was `Running`.
    async fn mark_error(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
