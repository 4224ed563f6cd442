// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capacity and Growth Decisions
//!
//! Pure arithmetic behind swarm growth. No I/O.
//!
//! - [`CapacitySnapshot`]: one racy point-in-time reading of the scheduler.
//! - [`SizingPolicy`]: how much of the shared queue one job may take.
//! - [`WorkerRange`]: inclusive task index range of a submission.
//! - [`GrowthDecision`]: the outcome of one evaluation, with every quantity
//!   that went into it so it can be logged verbatim.
//!
//! ## Rule
//!
//! ```text
//! avail       = floor(total_available_slots / availability_divisor)
//! avail <= cpus_to_leave            -> no growth
//! grabbable   = avail - cpus_to_leave
//! new_workers = floor(grabbable / 2)
//! new_workers == 0                  -> no growth
//! range       = slots_in_use_by_user + 1 ..= slots_in_use_by_user + new_workers
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use chunkswarm_core::domain::swarm_config::SizingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Free slots in the queue or partition the swarm submits to
    pub total_available_slots: u64,
    /// Slots held by the current user's running and pending tasks
    pub slots_in_use_by_user: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingPolicy {
    pub cpus_to_leave: u64,
    pub availability_divisor: u64,
}

impl SizingPolicy {
    pub fn new(cpus_to_leave: u64, availability_divisor: u64) -> Self {
        Self {
            cpus_to_leave,
            availability_divisor,
        }
    }

    /// Available slots after throttling. A zero divisor is treated as 1.
    pub fn throttled(&self, total_available_slots: u64) -> u64 {
        total_available_slots / self.availability_divisor.max(1)
    }
}

impl From<&SizingConfig> for SizingPolicy {
    fn from(config: &SizingConfig) -> Self {
        Self::new(config.cpus_to_leave, config.availability_divisor)
    }
}

/// Inclusive range of scheduler task indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRange {
    pub start: u64,
    pub end: u64,
}

impl WorkerRange {
    pub fn len(&self) -> u64 {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for WorkerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrowthOutcome {
    /// Throttled availability does not exceed the reserve
    BelowReserve,
    /// Grabbable capacity rounds down to zero workers
    TooFewSlots,
    Grow { range: WorkerRange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthDecision {
    pub snapshot: CapacitySnapshot,
    pub policy: SizingPolicy,
    pub avail: u64,
    pub grabbable: u64,
    pub new_workers: u64,
    pub outcome: GrowthOutcome,
}

impl GrowthDecision {
    pub fn evaluate(policy: SizingPolicy, snapshot: CapacitySnapshot) -> Self {
        let avail = policy.throttled(snapshot.total_available_slots);

        let grabbable = avail.saturating_sub(policy.cpus_to_leave);
        let new_workers = grabbable / 2;

        let outcome = if avail <= policy.cpus_to_leave {
            GrowthOutcome::BelowReserve
        } else if new_workers == 0 {
            GrowthOutcome::TooFewSlots
        } else {
            GrowthOutcome::Grow {
                range: WorkerRange {
                    start: snapshot.slots_in_use_by_user + 1,
                    end: snapshot.slots_in_use_by_user + new_workers,
                },
            }
        };

        Self {
            snapshot,
            policy,
            avail,
            grabbable,
            new_workers: if matches!(outcome, GrowthOutcome::Grow { .. }) { new_workers } else { 0 },
            outcome,
        }
    }

    pub fn range(&self) -> Option<WorkerRange> {
        match self.outcome {
            GrowthOutcome::Grow { range } => Some(range),
            _ => None,
        }
    }
}

impl fmt::Display for GrowthDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "available={} divisor={} avail={} reserved={} grabbable={} in_use={} ",
            self.snapshot.total_available_slots,
            self.policy.availability_divisor,
            self.avail,
            self.policy.cpus_to_leave,
            self.grabbable,
            self.snapshot.slots_in_use_by_user,
        )?;
        match self.outcome {
            GrowthOutcome::BelowReserve => write!(f, "-> no growth (avail <= reserve)"),
            GrowthOutcome::TooFewSlots => write!(f, "-> no growth (too few slots)"),
            GrowthOutcome::Grow { range } => write!(f, "-> adding {} workers ({})", range.len(), range),
        }
    }
}
