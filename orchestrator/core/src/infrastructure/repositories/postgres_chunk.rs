// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Chunk Store
//!
//! Backs the shared `chunks` table (see `cli/migrations`).
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Atomic chunk claim and completion across processes
//!
//! # Claim protocol
//!
//! Inside one transaction:
//! 1. `SELECT id ... WHERE job_id = $1 AND status = Available ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED`
//! 2. `UPDATE ... SET status = Running, worker_id, worker_name, claimed_at = now() WHERE id = selected`
//! 3. `COMMIT`
//!
//! The row lock is held from the select until commit, so two concurrent
//! claimers can never pick the same row; a claimer that meets a locked row
//! skips to the next lowest id instead of waiting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::chunk::{Chunk, ChunkId, ChunkStatus, JobId, JobSummary, WorkerId};
use crate::domain::repository::{ChunkStore, RepositoryError};

pub struct PostgresChunkStore {
    pool: PgPool,
}

impl PostgresChunkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for PostgresChunkStore {
    async fn create_chunks(&self, job_id: JobId, payloads: &[String]) -> Result<Vec<ChunkId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(payloads.len());

        for payload in payloads {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO chunks (job_id, status, payload)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(job_id.0)
            .bind(ChunkStatus::Available.code())
            .bind(payload)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to insert chunk: {}", e)))?;
            ids.push(ChunkId(id));
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn claim_next_chunk(
        &self,
        job_id: JobId,
        worker_id: WorkerId,
        worker_name: Option<&str>,
    ) -> Result<Option<ChunkId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let candidate: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM chunks
            WHERE job_id = $1 AND status = $2
            ORDER BY id ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(job_id.0)
        .bind(ChunkStatus::Available.code())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = candidate else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Mark as Running before the row lock is released
        sqlx::query(
            r#"
            UPDATE chunks
            SET status = $1, worker_id = $2, worker_name = $3, claimed_at = now()
            WHERE id = $4
            "#,
        )
        .bind(ChunkStatus::Running.code())
        .bind(worker_id.0)
        .bind(worker_name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(ChunkId(id)))
    }

    async fn mark_done(&self, worker_id: WorkerId, job_id: JobId, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE chunks
            SET status = $1
            WHERE id = $2 AND job_id = $3 AND worker_id = $4 AND status = $5
            "#,
        )
        .bind(ChunkStatus::Done.code())
        .bind(chunk_id.0)
        .bind(job_id.0)
        .bind(worker_id.0)
        .bind(ChunkStatus::Running.code())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_job_chunks(&self, job_id: JobId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chunks WHERE job_id = $1")
            .bind(job_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to delete chunks: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, chunk_id: ChunkId) -> Result<Option<Chunk>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, job_id, status, worker_id, worker_name, payload, created_at, claimed_at
            FROM chunks
            WHERE id = $1
            "#,
        )
        .bind(chunk_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_chunk_row).transpose()
    }

    async fn job_summary(&self, job_id: JobId) -> Result<JobSummary, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM chunks
            WHERE job_id = $1
            GROUP BY status
            "#,
        )
        .bind(job_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = JobSummary::empty(job_id);
        for row in rows {
            let code: i16 = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            let status = ChunkStatus::from_code(code)
                .ok_or_else(|| RepositoryError::Corrupt(format!("unknown chunk status code {}", code)))?;
            summary.record(status, count as u64);
        }
        Ok(summary)
    }

    async fn requeue_chunk(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE chunks
            SET status = $1, worker_id = NULL, worker_name = NULL, claimed_at = NULL
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(ChunkStatus::Available.code())
        .bind(chunk_id.0)
        .bind(ChunkStatus::Running.code())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_error(&self, chunk_id: ChunkId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE chunks SET status = $1 WHERE id = $2 AND status = $3")
            .bind(ChunkStatus::Error.code())
            .bind(chunk_id.0)
            .bind(ChunkStatus::Running.code())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn parse_chunk_row(row: PgRow) -> Result<Chunk, RepositoryError> {
    let code: i16 = row.try_get("status")?;
    let status = ChunkStatus::from_code(code)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown chunk status code {}", code)))?;
    let worker_id: Option<i64> = row.try_get("worker_id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let claimed_at: Option<DateTime<Utc>> = row.try_get("claimed_at")?;

    Ok(Chunk {
        id: ChunkId(row.try_get("id")?),
        job_id: JobId(row.try_get("job_id")?),
        status,
        worker_id: worker_id.map(WorkerId),
        worker_name: row.try_get("worker_name")?,
        payload: row.try_get("payload")?,
        created_at,
        claimed_at,
    })
}
