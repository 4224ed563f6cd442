// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Capacity Probe
//!
//! Combines the two scheduler readings into one [`CapacitySnapshot`]. The
//! readings are taken one after the other, each under its own timeout, and
//! are not re-validated against each other.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::capacity::CapacitySnapshot;
use crate::domain::scheduler::{BatchScheduler, SchedulerError};

#[derive(Clone)]
pub struct CapacityProbe {
    scheduler: Arc<dyn BatchScheduler>,
    timeout: Duration,
}

impl CapacityProbe {
    pub fn new(scheduler: Arc<dyn BatchScheduler>, timeout: Duration) -> Self {
        Self { scheduler, timeout }
    }

    pub async fn probe(&self) -> Result<CapacitySnapshot, SchedulerError> {
        let total_available_slots = self
            .bounded("queue available slots", self.scheduler.queue_available_slots())
            .await?;
        let slots_in_use_by_user = self
            .bounded("user slots in use", self.scheduler.user_slots_in_use())
            .await?;

        let snapshot = CapacitySnapshot {
            total_available_slots,
            slots_in_use_by_user,
        };
        tracing::debug!(
            scheduler = self.scheduler.name(),
            total_available_slots,
            slots_in_use_by_user,
            "Probed capacity"
        );
        Ok(snapshot)
    }

    async fn bounded<F>(&self, reading: &str, fut: F) -> Result<u64, SchedulerError>
    where
        F: std::future::Future<Output = Result<u64, SchedulerError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SchedulerError::Timeout {
                command: format!("{} {}", self.scheduler.name(), reading),
                seconds: self.timeout.as_secs(),
            })?
    }
}
