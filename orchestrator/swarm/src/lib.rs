// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `chunkswarm-swarm`: Elastic Worker Swarm
//!
//! Drives workers over the chunk queue and grows the swarm through an
//! external batch scheduler.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `GrowthDecision`, `BatchScheduler`, `ChunkProcessor` |
//! | [`application`] | Application | `CapacityProbe`, `SizingController`, `WorkerLoop` |
//! | [`infrastructure`] | Infrastructure | Grid Engine and Slurm adapters, shell chunk processor, signals |
//!
//! ## Key Concepts
//!
//! - **Prime worker**: the one worker that also evaluates growth, at startup
//!   and after every `grow_every` completed chunks.
//! - **Throttled availability**: free slots divided by the availability
//!   divisor, minus the slots left for other tenants, halved per cycle.
//! - **No liveness tracking**: a worker that dies leaves its chunk Running
//!   until an operator requeues it.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
