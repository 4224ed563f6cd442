// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into the PostgreSQL chunk store. Connection parameters arrive as
//! an explicit [`PostgresConfig`] value; nothing is read from ambient process
//! state here.

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::domain::repository::PostgresConfig;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using resolved store configuration.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let options = connect_options(config)?;
        tracing::debug!(
            host = %config.host,
            port = config.port,
            max_connections = config.max_connections,
            "Connecting to chunk store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to chunk store")?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

pub fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions> {
    if let Some(url) = &config.connection_string {
        return url
            .parse::<PgConnectOptions>()
            .context("Invalid chunk store connection string");
    }

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port);
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    Ok(options)
}
