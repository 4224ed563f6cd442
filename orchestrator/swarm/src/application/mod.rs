// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Capacity probing, growth decisions and the worker loop

pub mod capacity_probe;
pub mod sizing_controller;
pub mod worker_loop;
pub mod scheduler_factory;

pub use capacity_probe::CapacityProbe;
pub use scheduler_factory::create_scheduler;
pub use sizing_controller::{GrowthReport, SizingController};
pub use worker_loop::{PrimeGrowth, WorkerLoop, WorkerLoopError, WorkerSummary};
