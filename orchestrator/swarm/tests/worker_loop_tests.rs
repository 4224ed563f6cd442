// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chunkswarm_core::application::queue_client::QueueClient;
use chunkswarm_core::domain::chunk::{Chunk, ChunkStatus, JobId, WorkerId, WorkerIdentity};
use chunkswarm_core::infrastructure::repositories::InMemoryChunkStore;
use chunkswarm_swarm::application::{CapacityProbe, PrimeGrowth, SizingController, WorkerLoop};
use chunkswarm_swarm::domain::{BatchScheduler, ChunkProcessor, ProcessError, SchedulerError, SizingPolicy, WorkerRange};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records payloads; fails any payload listed in `fail`.
#[derive(Default)]
struct RecordingProcessor {
    seen: Mutex<Vec<String>>,
    fail: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
}

#[async_trait]
impl ChunkProcessor for RecordingProcessor {
    async fn process(&self, chunk: &Chunk, _worker: &WorkerIdentity) -> Result<(), ProcessError> {
        let count = {
            let mut seen = self.seen.lock();
            seen.push(chunk.payload.clone());
            seen.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if count == *after {
                token.cancel();
            }
        }
        if self.fail.contains(&chunk.payload) {
            return Err(ProcessError::Failed {
                status: Some(1),
                stderr: "bad input".to_string(),
            });
        }
        Ok(())
    }
}

struct CountingScheduler {
    available: u64,
    submissions: Mutex<Vec<WorkerRange>>,
    fail_submit: bool,
}

#[async_trait]
impl BatchScheduler for CountingScheduler {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn queue_available_slots(&self) -> Result<u64, SchedulerError> {
        Ok(self.available)
    }

    async fn user_slots_in_use(&self) -> Result<u64, SchedulerError> {
        Ok(self.submissions.lock().iter().map(|r| r.len()).sum())
    }

    async fn submit_workers(&self, range: WorkerRange, _script: &Path) -> Result<(), SchedulerError> {
        if self.fail_submit {
            return Err(SchedulerError::Timeout {
                command: "qsub".to_string(),
                seconds: 30,
            });
        }
        self.submissions.lock().push(range);
        Ok(())
    }
}

fn numbered(n: i64) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

fn identity(id: i64) -> WorkerIdentity {
    WorkerIdentity::new(WorkerId(id), Some(WorkerIdentity::host_slot_name("node", WorkerId(id))))
}

fn prime_growth(scheduler: Arc<CountingScheduler>, grow_every: u64) -> PrimeGrowth {
    let probe = CapacityProbe::new(scheduler.clone(), Duration::from_secs(1));
    PrimeGrowth {
        controller: SizingController::new(probe, scheduler),
        policy: SizingPolicy::new(70, 3),
        worker_script: PathBuf::from("./worker.sh"),
        grow_every,
    }
}

#[tokio::test]
async fn test_job_201_processed_by_one_worker() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(201), &numbered(50)).await.unwrap();

    let processor = Arc::new(RecordingProcessor::default());
    let summary = WorkerLoop::new(queue.clone(), JobId(201), identity(1), processor.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.claimed, 50);
    assert_eq!(summary.completed, 50);
    assert_eq!(summary.mismatched, 0);
    assert!(!summary.stopped_early);
    assert_eq!(*processor.seen.lock(), numbered(50));

    assert!(queue.request_chunk(WorkerId(1), JobId(201), None).await.unwrap().is_none());
    assert_eq!(queue.job_summary(JobId(201)).await.unwrap().done, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_workers_share_the_job() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(3), &numbered(200)).await.unwrap();

    let handles: Vec<_> = (1..=8)
        .map(|w| {
            let queue = queue.clone();
            tokio::spawn(async move {
                WorkerLoop::new(queue, JobId(3), identity(w), Arc::new(RecordingProcessor::default()))
                    .run()
                    .await
                    .unwrap()
            })
        })
        .collect();

    let total: u64 = futures_completed(handles).await;
    assert_eq!(total, 200);
    assert_eq!(queue.job_summary(JobId(3)).await.unwrap().done, 200);
}

async fn futures_completed(handles: Vec<tokio::task::JoinHandle<chunkswarm_swarm::application::WorkerSummary>>) -> u64 {
    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap().completed;
    }
    total
}

#[tokio::test]
async fn test_prime_worker_grows_at_start_and_every_k() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(4), &numbered(25)).await.unwrap();

    let scheduler = Arc::new(CountingScheduler {
        available: 300,
        submissions: Mutex::new(Vec::new()),
        fail_submit: false,
    });

    let summary = WorkerLoop::new(queue, JobId(4), identity(1), Arc::new(RecordingProcessor::default()))
        .with_growth(prime_growth(scheduler.clone(), 10))
        .run()
        .await
        .unwrap();

    // startup, after 10, after 20
    assert_eq!(summary.growth_cycles, 3);
    assert_eq!(summary.workers_requested, 45);

    let submissions = scheduler.submissions.lock();
    assert_eq!(
        *submissions,
        vec![
            WorkerRange { start: 1, end: 15 },
            WorkerRange { start: 16, end: 30 },
            WorkerRange { start: 31, end: 45 },
        ]
    );
}

#[tokio::test]
async fn test_submission_failure_does_not_stop_processing() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(5), &numbered(5)).await.unwrap();

    let scheduler = Arc::new(CountingScheduler {
        available: 300,
        submissions: Mutex::new(Vec::new()),
        fail_submit: true,
    });

    let summary = WorkerLoop::new(queue, JobId(5), identity(1), Arc::new(RecordingProcessor::default()))
        .with_growth(prime_growth(scheduler, 2))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.completed, 5);
    assert_eq!(summary.workers_requested, 0);
    assert_eq!(summary.growth_cycles, 3);
}

#[tokio::test]
async fn test_failed_chunk_is_left_running() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(6), &numbered(4)).await.unwrap();

    let processor = Arc::new(RecordingProcessor {
        fail: vec!["2".to_string()],
        ..Default::default()
    });
    let summary = WorkerLoop::new(queue.clone(), JobId(6), identity(9), processor)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.claimed, 4);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 1);

    let job = queue.job_summary(JobId(6)).await.unwrap();
    assert_eq!(job.running, 1);
    assert_eq!(job.done, 3);

    let stuck = queue.find_chunk(chunkswarm_core::domain::chunk::ChunkId(2)).await.unwrap().unwrap();
    assert_eq!(stuck.status, ChunkStatus::Running);
    assert_eq!(stuck.worker_id, Some(WorkerId(9)));
}

#[tokio::test]
async fn test_stop_finishes_current_chunk_then_exits() {
    let queue = QueueClient::new(Arc::new(InMemoryChunkStore::new()));
    queue.create_chunks(JobId(7), &numbered(10)).await.unwrap();

    let token = CancellationToken::new();
    let processor = Arc::new(RecordingProcessor {
        cancel_after: Some((3, token.clone())),
        ..Default::default()
    });

    let summary = WorkerLoop::new(queue.clone(), JobId(7), identity(2), processor)
        .with_shutdown(token)
        .run()
        .await
        .unwrap();

    assert!(summary.stopped_early);
    assert_eq!(summary.claimed, 3);
    assert_eq!(summary.completed, 3);

    let job = queue.job_summary(JobId(7)).await.unwrap();
    assert_eq!(job.done, 3);
    assert_eq!(job.available, 7);
    assert_eq!(job.running, 0);
}
