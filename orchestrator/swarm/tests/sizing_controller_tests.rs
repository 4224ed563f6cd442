// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chunkswarm_swarm::application::{CapacityProbe, GrowthReport, SizingController};
use chunkswarm_swarm::domain::{BatchScheduler, GrowthOutcome, SchedulerError, SizingPolicy, WorkerRange};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct MockScheduler {
    available: u64,
    in_use: u64,
    fail_probe: bool,
    fail_submit: bool,
    hang: bool,
    submissions: Mutex<Vec<(WorkerRange, PathBuf)>>,
}

#[async_trait]
impl BatchScheduler for MockScheduler {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn queue_available_slots(&self) -> Result<u64, SchedulerError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail_probe {
            return Err(SchedulerError::Parse("garbled qstat".to_string()));
        }
        Ok(self.available)
    }

    async fn user_slots_in_use(&self) -> Result<u64, SchedulerError> {
        Ok(self.in_use)
    }

    async fn submit_workers(&self, range: WorkerRange, script: &Path) -> Result<(), SchedulerError> {
        if self.fail_submit {
            return Err(SchedulerError::CommandFailed {
                command: "qsub".to_string(),
                status: Some(1),
                stderr: "denied".to_string(),
            });
        }
        self.submissions.lock().push((range, script.to_path_buf()));
        Ok(())
    }
}

fn controller(scheduler: Arc<MockScheduler>) -> SizingController {
    let probe = CapacityProbe::new(scheduler.clone(), Duration::from_millis(200));
    SizingController::new(probe, scheduler)
}

#[tokio::test]
async fn test_grows_fifteen_workers() {
    let scheduler = Arc::new(MockScheduler {
        available: 300,
        ..Default::default()
    });
    let report = controller(scheduler.clone())
        .consider_growth(SizingPolicy::new(70, 3), Path::new("./worker.sh"))
        .await
        .unwrap();

    assert!(report.is_submitted());
    assert_eq!(report.workers_requested(), 15);

    let submissions = scheduler.submissions.lock();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, WorkerRange { start: 1, end: 15 });
    assert_eq!(submissions[0].1, PathBuf::from("./worker.sh"));
}

#[tokio::test]
async fn test_new_indices_start_after_user_slots() {
    let scheduler = Arc::new(MockScheduler {
        available: 300,
        in_use: 40,
        ..Default::default()
    });
    controller(scheduler.clone())
        .consider_growth(SizingPolicy::new(70, 3), Path::new("./worker.sh"))
        .await
        .unwrap();

    assert_eq!(scheduler.submissions.lock()[0].0, WorkerRange { start: 41, end: 55 });
}

#[tokio::test]
async fn test_no_growth_at_reserve() {
    let scheduler = Arc::new(MockScheduler {
        available: 210,
        ..Default::default()
    });
    let report = controller(scheduler.clone())
        .consider_growth(SizingPolicy::new(70, 3), Path::new("./worker.sh"))
        .await
        .unwrap();

    match report {
        GrowthReport::NoGrowth(decision) => {
            assert_eq!(decision.avail, 70);
            assert_eq!(decision.outcome, GrowthOutcome::BelowReserve);
        }
        other => panic!("unexpected report: {other:?}"),
    }
    assert!(scheduler.submissions.lock().is_empty());
}

#[tokio::test]
async fn test_probe_failure_skips_growth() {
    let scheduler = Arc::new(MockScheduler {
        available: 1000,
        fail_probe: true,
        ..Default::default()
    });
    let report = controller(scheduler.clone())
        .consider_growth(SizingPolicy::new(0, 1), Path::new("./worker.sh"))
        .await
        .unwrap();

    assert!(matches!(report, GrowthReport::ProbeFailed(_)));
    assert!(scheduler.submissions.lock().is_empty());
}

#[tokio::test]
async fn test_probe_timeout_skips_growth() {
    let scheduler = Arc::new(MockScheduler {
        available: 1000,
        hang: true,
        ..Default::default()
    });
    let report = controller(scheduler.clone())
        .consider_growth(SizingPolicy::new(0, 1), Path::new("./worker.sh"))
        .await
        .unwrap();

    assert!(matches!(report, GrowthReport::ProbeFailed(_)));
    assert!(scheduler.submissions.lock().is_empty());
}

#[tokio::test]
async fn test_dry_run_does_not_submit() {
    let scheduler = Arc::new(MockScheduler {
        available: 300,
        ..Default::default()
    });
    let report = controller(scheduler.clone())
        .with_dry_run(true)
        .consider_growth(SizingPolicy::new(70, 3), Path::new("./worker.sh"))
        .await
        .unwrap();

    match report {
        GrowthReport::DryRun(decision) => assert_eq!(decision.new_workers, 15),
        other => panic!("unexpected report: {other:?}"),
    }
    assert_eq!(report_count(&scheduler), 0);
}

#[tokio::test]
async fn test_submission_error_is_returned() {
    let scheduler = Arc::new(MockScheduler {
        available: 300,
        fail_submit: true,
        ..Default::default()
    });
    let err = controller(scheduler)
        .consider_growth(SizingPolicy::new(70, 3), Path::new("./worker.sh"))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::CommandFailed { .. }));
}

fn report_count(scheduler: &MockScheduler) -> usize {
    scheduler.submissions.lock().len()
}
