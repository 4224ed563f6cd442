// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete [`ChunkStore`] for the configured storage backend.
//! The domain layer only names the trait; this module picks the adapter.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wire the chunk store implementation from configuration

use anyhow::Result;
use std::sync::Arc;

use crate::domain::repository::{ChunkStore, StorageBackend};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{InMemoryChunkStore, PostgresChunkStore};

/// Creates a ChunkStore implementation based on the configured backend.
///
/// Connects to PostgreSQL when required; the in-memory store is returned
/// immediately and is private to this process.
pub async fn create_chunk_store(backend: &StorageBackend) -> Result<Arc<dyn ChunkStore>> {
    match backend {
        StorageBackend::InMemory => {
            tracing::warn!("Using in-memory chunk store; chunks are not shared with other processes");
            Ok(Arc::new(InMemoryChunkStore::new()))
        }
        StorageBackend::PostgreSQL(config) => {
            let db = Database::connect(config).await?;
            Ok(Arc::new(PostgresChunkStore::new(db.get_pool().clone())))
        }
    }
}
