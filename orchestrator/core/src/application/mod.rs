// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod queue_client;
pub mod repository_factory;

pub use queue_client::{QueueClient, QueueError};
pub use repository_factory::create_chunk_store;
