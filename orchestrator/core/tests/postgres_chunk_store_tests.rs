// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Run with a disposable database:
//!
//! ```bash
//! CHUNKSWARM_TEST_DATABASE_URL=postgres://localhost/chunkswarm_test \
//!     cargo test -p chunkswarm-core --test postgres_chunk_store_tests -- --ignored
//! ```

use chunkswarm_core::domain::chunk::{ChunkStatus, JobId, WorkerId};
use chunkswarm_core::domain::repository::ChunkStore;
use chunkswarm_core::infrastructure::repositories::PostgresChunkStore;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashSet;
use std::sync::Arc;

const SCHEMA: &str = include_str!("../../../cli/migrations/20260101000000_create_chunks.sql");

async fn store() -> Arc<PostgresChunkStore> {
    let url = std::env::var("CHUNKSWARM_TEST_DATABASE_URL")
        .expect("CHUNKSWARM_TEST_DATABASE_URL must be set for Postgres tests");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::raw_sql(SCHEMA).execute(&pool).await.expect("apply schema");
    Arc::new(PostgresChunkStore::new(pool))
}

fn numbered(n: i64) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

#[tokio::test]
#[ignore]
async fn test_claim_and_complete_roundtrip() {
    let store = store().await;
    let job = JobId(90_001);
    store.delete_job_chunks(job).await.unwrap();

    let ids = store.create_chunks(job, &numbered(3)).await.unwrap();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let claimed = store.claim_next_chunk(job, WorkerId(1), Some("pg-1")).await.unwrap();
    assert_eq!(claimed, Some(ids[0]));

    let chunk = store.find_by_id(ids[0]).await.unwrap().unwrap();
    assert_eq!(chunk.status, ChunkStatus::Running);
    assert_eq!(chunk.worker_name.as_deref(), Some("pg-1"));
    assert!(chunk.claimed_at.is_some());

    assert!(!store.mark_done(WorkerId(2), job, ids[0]).await.unwrap());
    assert!(store.mark_done(WorkerId(1), job, ids[0]).await.unwrap());
    assert!(!store.mark_done(WorkerId(1), job, ids[0]).await.unwrap());

    assert_eq!(store.delete_job_chunks(job).await.unwrap(), 3);
    assert_eq!(store.delete_job_chunks(job).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_claims_are_unique() {
    let store = store().await;
    let job = JobId(90_002);
    store.delete_job_chunks(job).await.unwrap();
    store.create_chunks(job, &numbered(30)).await.unwrap();

    let handles: Vec<_> = (0..50)
        .map(|w| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_next_chunk(job, WorkerId(w), None).await.unwrap() })
        })
        .collect();

    let claimed: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|r| r.unwrap())
        .collect();

    assert_eq!(claimed.len(), 30);
    assert_eq!(claimed.iter().collect::<HashSet<_>>().len(), 30);

    let summary = store.job_summary(job).await.unwrap();
    assert_eq!(summary.running, 30);
    assert!(summary.is_exhausted());

    store.delete_job_chunks(job).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_operator_recovery() {
    let store = store().await;
    let job = JobId(90_003);
    store.delete_job_chunks(job).await.unwrap();
    let ids = store.create_chunks(job, &numbered(2)).await.unwrap();

    assert!(!store.requeue_chunk(ids[0]).await.unwrap());
    store.claim_next_chunk(job, WorkerId(4), None).await.unwrap();
    assert!(store.requeue_chunk(ids[0]).await.unwrap());

    let chunk = store.find_by_id(ids[0]).await.unwrap().unwrap();
    assert_eq!(chunk.status, ChunkStatus::Available);
    assert_eq!(chunk.worker_id, None);

    store.claim_next_chunk(job, WorkerId(5), None).await.unwrap();
    assert!(store.mark_error(ids[0]).await.unwrap());

    let summary = store.job_summary(job).await.unwrap();
    assert_eq!(summary.error, 1);
    assert_eq!(summary.available, 1);

    store.delete_job_chunks(job).await.unwrap();
}
