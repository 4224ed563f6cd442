// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Sizing Controller
//!
//! One growth evaluation per call:
//!
//! 1. Probe capacity. A failed or timed-out probe skips growth this cycle.
//! 2. Evaluate [`GrowthDecision`] against the sizing policy.
//! 3. Submit the worker range, unless this is a dry run.
//!
//! Submission is fire-and-forget: it is not retried and the new workers are
//! not waited for. A submission error is returned so the caller can log it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Decide and request swarm growth

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::capacity_probe::CapacityProbe;
use crate::domain::capacity::{GrowthDecision, SizingPolicy};
use crate::domain::scheduler::{BatchScheduler, SchedulerError};

/// What one growth cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrowthReport {
    /// Capacity could not be read; treated as no capacity
    ProbeFailed(String),
    NoGrowth(GrowthDecision),
    DryRun(GrowthDecision),
    Submitted(GrowthDecision),
}

impl GrowthReport {
    /// Workers actually requested from the scheduler this cycle.
    pub fn workers_requested(&self) -> u64 {
        match self {
            GrowthReport::Submitted(decision) => decision.new_workers,
            _ => 0,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, GrowthReport::Submitted(_))
    }
}

#[derive(Clone)]
pub struct SizingController {
    probe: CapacityProbe,
    scheduler: Arc<dyn BatchScheduler>,
    dry_run: bool,
}

impl SizingController {
    pub fn new(probe: CapacityProbe, scheduler: Arc<dyn BatchScheduler>) -> Self {
        Self {
            probe,
            scheduler,
            dry_run: false,
        }
    }

    /// Log decisions without submitting anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn consider_growth(
        &self,
        policy: SizingPolicy,
        worker_script: &Path,
    ) -> Result<GrowthReport, SchedulerError> {
        let snapshot = match self.probe.probe().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                metrics::counter!("chunkswarm_probe_failures_total").increment(1);
                warn!(error = %e, "Capacity probe failed; assuming no capacity this cycle");
                return Ok(GrowthReport::ProbeFailed(e.to_string()));
            }
        };

        let decision = GrowthDecision::evaluate(policy, snapshot);
        info!(
            available = snapshot.total_available_slots,
            divisor = policy.availability_divisor,
            avail = decision.avail,
            reserved = policy.cpus_to_leave,
            grabbable = decision.grabbable,
            in_use = snapshot.slots_in_use_by_user,
            adding = decision.new_workers,
            "Growth decision: {}",
            decision
        );

        let Some(range) = decision.range() else {
            return Ok(GrowthReport::NoGrowth(decision));
        };

        if self.dry_run {
            info!(range = %range, script = %worker_script.display(), "Dry run; not submitting workers");
            return Ok(GrowthReport::DryRun(decision));
        }

        self.scheduler.submit_workers(range, worker_script).await?;
        metrics::counter!("chunkswarm_workers_requested_total").increment(range.len());
        info!(
            scheduler = self.scheduler.name(),
            range = %range,
            script = %worker_script.display(),
            "Submitted {} workers",
            range.len()
        );
        Ok(GrowthReport::Submitted(decision))
    }
}
