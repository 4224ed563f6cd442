// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Chunk value objects, the chunk store contract, configuration

pub mod chunk;
pub mod repository;
pub mod swarm_config;
