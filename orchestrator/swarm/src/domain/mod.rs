// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure sizing types and the scheduler port. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`capacity`] | `CapacitySnapshot`, `SizingPolicy`, `GrowthDecision` |
//! | [`scheduler`] | `BatchScheduler`, `SchedulerError` |
//! | [`processor`] | `ChunkProcessor`, `ProcessError` |

pub mod capacity;
pub mod scheduler;
pub mod processor;

pub use capacity::*;
pub use scheduler::*;
pub use processor::*;
