// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Queue Client
//!
//! Worker-facing façade over a [`ChunkStore`]. Stateless: every call is one
//! round trip (two for `request_chunk`) and nothing is cached between calls.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Create, claim, complete and reset chunks on behalf of workers
//!
//! Ids are validated before the store is touched, so a rejected call is never
//! partially applied.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::chunk::{Chunk, ChunkId, IdError, JobId, JobSummary, WorkerId};
use crate::domain::repository::{ChunkStore, RepositoryError};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid request: {0}")]
    Validation(#[from] IdError),

    #[error(transparent)]
    Store(#[from] RepositoryError),

    /// The claim succeeded but the record was gone by the time it was read
    /// back. Only possible when a reset raced an active worker.
    #[error("Chunk {0} was claimed but no longer exists")]
    ChunkVanished(ChunkId),
}

#[derive(Clone)]
pub struct QueueClient {
    store: Arc<dyn ChunkStore>,
}

impl QueueClient {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }

    pub async fn create_chunks(&self, job_id: JobId, payloads: &[String]) -> Result<Vec<ChunkId>, QueueError> {
        job_id.validate()?;
        let ids = self.store.create_chunks(job_id, payloads).await?;
        info!(job_id = %job_id, count = ids.len(), "Created chunks");
        Ok(ids)
    }

    /// Claim the next chunk of `job_id` and return the full record.
    ///
    /// `Ok(None)` means the job has no Available chunks left.
    pub async fn request_chunk(
        &self,
        worker_id: WorkerId,
        job_id: JobId,
        worker_name: Option<&str>,
    ) -> Result<Option<Chunk>, QueueError> {
        worker_id.validate()?;
        job_id.validate()?;

        let Some(chunk_id) = self.store.claim_next_chunk(job_id, worker_id, worker_name).await? else {
            debug!(job_id = %job_id, worker_id = %worker_id, "No chunks available");
            return Ok(None);
        };
        metrics::counter!("chunkswarm_chunks_claimed_total").increment(1);

        let chunk = self
            .store
            .find_by_id(chunk_id)
            .await?
            .ok_or(QueueError::ChunkVanished(chunk_id))?;

        debug!(job_id = %job_id, worker_id = %worker_id, chunk_id = %chunk_id, "Claimed chunk");
        Ok(Some(chunk))
    }

    /// Claim up to `n` chunks with independent single claims. Stops at the
    /// first miss.
    pub async fn request_chunks(
        &self,
        worker_id: WorkerId,
        job_id: JobId,
        worker_name: Option<&str>,
        n: usize,
    ) -> Result<Vec<Chunk>, QueueError> {
        let mut chunks = Vec::with_capacity(n);
        while chunks.len() < n {
            match self.request_chunk(worker_id, job_id, worker_name).await? {
                Some(chunk) => chunks.push(chunk),
                None => break,
            }
        }
        Ok(chunks)
    }

    /// Mark a held chunk Done. `false` means the worker did not hold it.
    pub async fn complete_chunk(&self, worker_id: WorkerId, job_id: JobId, chunk_id: ChunkId) -> Result<bool, QueueError> {
        worker_id.validate()?;
        job_id.validate()?;
        chunk_id.validate()?;

        let done = self.store.mark_done(worker_id, job_id, chunk_id).await?;
        if done {
            metrics::counter!("chunkswarm_chunks_completed_total").increment(1);
            debug!(job_id = %job_id, worker_id = %worker_id, chunk_id = %chunk_id, "Completed chunk");
        } else {
            metrics::counter!("chunkswarm_completion_mismatches_total").increment(1);
            warn!(
                job_id = %job_id,
                worker_id = %worker_id,
                chunk_id = %chunk_id,
                "Chunk was not held by this worker; completion ignored"
            );
        }
        Ok(done)
    }

    /// Delete every chunk of the job. Returns the number removed.
    ///
    /// Callers must make sure no worker is still running against the job.
    pub async fn reset_job(&self, job_id: JobId) -> Result<u64, QueueError> {
        job_id.validate()?;
        let removed = self.store.delete_job_chunks(job_id).await?;
        info!(job_id = %job_id, removed, "Reset job");
        Ok(removed)
    }

    pub async fn job_summary(&self, job_id: JobId) -> Result<JobSummary, QueueError> {
        job_id.validate()?;
        Ok(self.store.job_summary(job_id).await?)
    }

    pub async fn find_chunk(&self, chunk_id: ChunkId) -> Result<Option<Chunk>, QueueError> {
        chunk_id.validate()?;
        Ok(self.store.find_by_id(chunk_id).await?)
    }

    /// Operator recovery for a chunk stuck in Running.
    pub async fn requeue_chunk(&self, chunk_id: ChunkId) -> Result<bool, QueueError> {
        chunk_id.validate()?;
        let requeued = self.store.requeue_chunk(chunk_id).await?;
        if requeued {
            info!(chunk_id = %chunk_id, "Requeued chunk");
        } else {
            warn!(chunk_id = %chunk_id, "Chunk is not running; nothing to requeue");
        }
        Ok(requeued)
    }

    /// Operator action: give up on a Running chunk.
    pub async fn fail_chunk(&self, chunk_id: ChunkId) -> Result<bool, QueueError> {
        chunk_id.validate()?;
        let failed = self.store.mark_error(chunk_id).await?;
        if failed {
            info!(chunk_id = %chunk_id, "Marked chunk as error");
        } else {
            warn!(chunk_id = %chunk_id, "Chunk is not running; not marked as error");
        }
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryChunkStore;

    fn client() -> (QueueClient, InMemoryChunkStore) {
        let store = InMemoryChunkStore::new();
        (QueueClient::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_validation_happens_before_store() {
        let (client, store) = client();

        let err = client.create_chunks(JobId(-1), &["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(IdError::Negative { .. })));
        assert!(store.is_empty());

        let err = client.complete_chunk(WorkerId(1), JobId(1), ChunkId(0)).await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(IdError::NotPositive { .. })));

        let err = client.request_chunk(WorkerId(-5), JobId(1), None).await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[tokio::test]
    async fn test_request_returns_payload() {
        let (client, _) = client();
        client
            .create_chunks(JobId(3), &["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();

        let chunk = client.request_chunk(WorkerId(2), JobId(3), Some("n-2")).await.unwrap().unwrap();
        assert_eq!(chunk.payload, "alpha");
        assert_eq!(chunk.worker_name.as_deref(), Some("n-2"));
    }

    #[tokio::test]
    async fn test_request_chunks_stops_at_first_miss() {
        let (client, _) = client();
        let payloads: Vec<String> = (1..=3).map(|i| i.to_string()).collect();
        client.create_chunks(JobId(4), &payloads).await.unwrap();

        let batch = client.request_chunks(WorkerId(1), JobId(4), None, 10).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(client.request_chunks(WorkerId(1), JobId(4), None, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operator_actions() {
        let (client, _) = client();
        client.create_chunks(JobId(8), &["p".to_string()]).await.unwrap();
        let chunk = client.request_chunk(WorkerId(1), JobId(8), None).await.unwrap().unwrap();

        assert!(client.requeue_chunk(chunk.id).await.unwrap());
        assert!(!client.requeue_chunk(chunk.id).await.unwrap());

        let again = client.request_chunk(WorkerId(2), JobId(8), None).await.unwrap().unwrap();
        assert_eq!(again.id, chunk.id);
        assert!(client.fail_chunk(again.id).await.unwrap());

        let summary = client.job_summary(JobId(8)).await.unwrap();
        assert_eq!(summary.error, 1);
        assert!(summary.is_exhausted());
    }
}
