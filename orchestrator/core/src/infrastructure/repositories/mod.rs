// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Chunk Store Implementations
//!
//! Infrastructure implementations of the [`ChunkStore`] contract defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and claim chunk records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresChunkStore** - shared table used by workers on every host.
//!   Claims run in a transaction with `FOR UPDATE SKIP LOCKED`.
//! - **InMemoryChunkStore** - single-process store for development and tests.
//!   One mutex guards the whole table, so every operation is atomic.

pub mod postgres_chunk;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::chunk::{Chunk, ChunkId, ChunkStatus, JobId, JobSummary, WorkerId};
use crate::domain::repository::{ChunkStore, RepositoryError};

pub use postgres_chunk::PostgresChunkStore;

#[derive(Debug, Default)]
struct ChunkTable {
    last_id: i64,
    chunks: BTreeMap<ChunkId, Chunk>,
}

/// Thread-safe, ordered, in-process chunk table.
///
/// Cloning creates a new handle to the **same** table.
#[derive(Clone, Default)]
pub struct InMemoryChunkStore {
    table: Arc<Mutex<ChunkTable>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunk rows across all jobs
    pub fn len(&self) -> usize {
        self.table.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().chunks.is_empty()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn create_chunks(&self, job_id: JobId, payloads: &[String]) -> Result<Vec<ChunkId>, RepositoryError> {
        let mut table = self.table.lock();
        let now = Utc::now();
        let mut ids = Vec::with_capacity(payloads.len());

        for payload in payloads {
            table.last_id += 1;
            let id = ChunkId(table.last_id);
            table.chunks.insert(
                id,
                Chunk {
                    id,
                    job_id,
                    status: ChunkStatus::Available,
                    worker_id: None,
                    worker_name: None,
                    payload: payload.clone(),
                    created_at: now,
                    claimed_at: None,
                },
            );
            ids.push(id);
        }

        Ok(ids)
    }

    async fn claim_next_chunk(
        &self,
        job_id: JobId,
        worker_id: WorkerId,
        worker_name: Option<&str>,
    ) -> Result<Option<ChunkId>, RepositoryError> {
        let mut table = self.table.lock();
        let next = table
            .chunks
            .values_mut()
            .find(|c| c.job_id == job_id && c.status == ChunkStatus::Available);

        Ok(next.map(|chunk| {
            chunk.status = ChunkStatus::Running;
            chunk.worker_id = Some(worker_id);
            chunk.worker_name = worker_name.map(str::to_string);
            chunk.claimed_at = Some(Utc::now());
            chunk.id
        }))
    }

    async fn mark_done(&self, worker_id: WorkerId, job_id: JobId, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let mut table = self.table.lock();
        match table.chunks.get_mut(&chunk_id) {
            Some(chunk) if chunk.is_held_by(worker_id, job_id) => {
                chunk.status = ChunkStatus::Done;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_job_chunks(&self, job_id: JobId) -> Result<u64, RepositoryError> {
        let mut table = self.table.lock();
        let before = table.chunks.len();
        table.chunks.retain(|_, c| c.job_id != job_id);
        Ok((before - table.chunks.len()) as u64)
    }

    async fn find_by_id(&self, chunk_id: ChunkId) -> Result<Option<Chunk>, RepositoryError> {
        Ok(self.table.lock().chunks.get(&chunk_id).cloned())
    }

    async fn job_summary(&self, job_id: JobId) -> Result<JobSummary, RepositoryError> {
        let table = self.table.lock();
        let mut summary = JobSummary::empty(job_id);
        for chunk in table.chunks.values().filter(|c| c.job_id == job_id) {
            summary.record(chunk.status, 1);
        }
        Ok(summary)
    }

    async fn requeue_chunk(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let mut table = self.table.lock();
        match table.chunks.get_mut(&chunk_id) {
            Some(chunk) if chunk.status == ChunkStatus::Running => {
                chunk.status = ChunkStatus::Available;
                chunk.worker_id = None;
                chunk.worker_name = None;
                chunk.claimed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_error(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let mut table = self.table.lock();
        match table.chunks.get_mut(&chunk_id) {
            Some(chunk) if chunk.status == ChunkStatus::Running => {
                chunk.status = ChunkStatus::Error;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
