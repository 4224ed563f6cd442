// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chunk queue core
//!
//! Shared chunk table, the atomic claim protocol, and the configuration
//! manifest used by every chunkswarm process.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, queue client and chunk store adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
