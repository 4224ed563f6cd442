// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the chunkswarm CLI

pub mod chunk;
pub mod config;
pub mod job;
pub mod swarm;
pub mod update;
pub mod work;

pub use self::chunk::ChunkCommand;
pub use self::config::ConfigCommand;
pub use self::job::JobCommand;
pub use self::swarm::SwarmCommand;
pub use self::update::UpdateCommand;
pub use self::work::WorkCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;

use chunkswarm_core::application::{create_chunk_store, QueueClient};
use chunkswarm_core::domain::swarm_config::SwarmConfigManifest;

/// Load, override from the environment and validate the configuration.
pub fn load_config(config_override: Option<PathBuf>) -> Result<SwarmConfigManifest> {
    let config = SwarmConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Queue client over the configured chunk store.
pub async fn queue_client(config: &SwarmConfigManifest) -> Result<QueueClient> {
    let backend = config.storage_backend()?;
    let store = create_chunk_store(&backend).await?;
    Ok(QueueClient::new(store))
}
