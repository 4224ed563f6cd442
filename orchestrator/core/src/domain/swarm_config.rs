// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Swarm Configuration Types
//
// Defines the configuration schema shared by every chunkswarm process:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Chunk store connection, directly or through a named credentials profile
// - Swarm sizing limits (reserve, throttling divisor, worker script)
// - Batch scheduler selection
// - Per-chunk worker command

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "chunkswarm/v1";
pub const KIND: &str = "SwarmConfig";

/// Top-level Kubernetes-style swarm configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfigManifest {
    /// API version (must be "chunkswarm/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SwarmConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SwarmConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfigSpec {
    #[serde(default)]
    pub store: StoreConfig,

    /// Named credential sets selectable through `store.profile`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, CredentialsProfile>,

    #[serde(default)]
    pub sizing: SizingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    #[default]
    Postgres,
    InMemory,
}

/// Chunk store connection parameters.
///
/// Any field left unset is filled from the selected profile. A full
/// connection string (usually from `CHUNKSWARM_DATABASE_URL`) wins over both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackendKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Name of an entry in `spec.profiles`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            connection_string: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            profile: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Limits applied by the prime worker when growing the swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Slots always left free for other tenants
    #[serde(default)]
    pub cpus_to_leave: u64,

    /// Only `available / divisor` slots are considered per decision (>= 1)
    #[serde(default = "default_availability_divisor")]
    pub availability_divisor: u64,

    /// Executable every newly submitted worker runs
    #[serde(default = "default_worker_script")]
    pub worker_script: PathBuf,

    /// Completed chunks between growth evaluations on the prime worker
    #[serde(default = "default_grow_every")]
    pub grow_every: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            cpus_to_leave: 0,
            availability_divisor: default_availability_divisor(),
            worker_script: default_worker_script(),
            grow_every: default_grow_every(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    #[default]
    GridEngine,
    Slurm,
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerKind::GridEngine => write!(f, "grid_engine"),
            SchedulerKind::Slurm => write!(f, "slurm"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub kind: SchedulerKind,

    /// Cluster queue (Grid Engine) or partition (Slurm) the swarm submits to
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Account whose usage is counted; defaults to `$USER`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            kind: SchedulerKind::default(),
            queue: default_queue(),
            user: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Shell command run once per claimed chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_timeout_secs: Option<u64>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_availability_divisor() -> u64 {
    1
}

fn default_worker_script() -> PathBuf {
    PathBuf::from("./worker.sh")
}

fn default_grow_every() -> u64 {
    100
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_queue() -> String {
    "all.q".to_string()
}

fn default_command_timeout() -> u64 {
    30
}

impl Default for SwarmConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "chunkswarm".to_string(),
                version: None,
                labels: None,
            },
            spec: SwarmConfigSpec::default(),
        }
    }
}

impl SwarmConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CHUNKSWARM_CONFIG_PATH environment variable
    /// 2. ./chunkswarm.yaml (working directory)
    /// 3. ~/.chunkswarm/config.yaml (user home)
    /// 4. /etc/chunkswarm/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CHUNKSWARM_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./chunkswarm.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".chunkswarm").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/chunkswarm/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CHUNKSWARM_DATABASE_URL") {
            tracing::info!("Environment override: CHUNKSWARM_DATABASE_URL");
            self.spec.store.connection_string = Some(url);
        }

        if let Some(password) = lookup("CHUNKSWARM_DB_PASSWORD") {
            tracing::info!("Environment override: CHUNKSWARM_DB_PASSWORD");
            self.spec.store.password = Some(password);
        }

        if let Some(val) = lookup("CHUNKSWARM_CPUS_TO_LEAVE") {
            match val.trim().parse::<u64>() {
                Ok(n) => {
                    tracing::info!("Environment override: CHUNKSWARM_CPUS_TO_LEAVE={}", n);
                    self.spec.sizing.cpus_to_leave = n;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CHUNKSWARM_CPUS_TO_LEAVE: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("CHUNKSWARM_AVAILABILITY_DIVISOR") {
            match val.trim().parse::<u64>() {
                Ok(n) => {
                    tracing::info!("Environment override: CHUNKSWARM_AVAILABILITY_DIVISOR={}", n);
                    self.spec.sizing.availability_divisor = n;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CHUNKSWARM_AVAILABILITY_DIVISOR: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.store.max_connections == 0 {
            anyhow::bail!("spec.store.max_connections must be greater than 0");
        }

        if let Some(profile) = &self.spec.store.profile {
            if !self.spec.profiles.contains_key(profile) {
                anyhow::bail!("Store profile '{}' not found in spec.profiles", profile);
            }
        }

        let sizing = &self.spec.sizing;
        if sizing.availability_divisor == 0 {
            anyhow::bail!("spec.sizing.availability_divisor must be at least 1");
        }

        if sizing.worker_script.as_os_str().is_empty() {
            anyhow::bail!("spec.sizing.worker_script cannot be empty");
        }

        if sizing.probe_timeout_secs == 0 {
            anyhow::bail!("spec.sizing.probe_timeout_secs must be greater than 0");
        }

        if self.spec.scheduler.queue.trim().is_empty() {
            anyhow::bail!("spec.scheduler.queue cannot be empty");
        }

        if self.spec.scheduler.command_timeout_secs == 0 {
            anyhow::bail!("spec.scheduler.command_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Resolve the store section, merging in the selected profile.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        let store = &self.spec.store;
        if store.backend == StoreBackendKind::InMemory {
            return Ok(StorageBackend::InMemory);
        }

        let profile = match &store.profile {
            Some(name) => self
                .spec
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Store profile '{}' not found in spec.profiles", name))?,
            None => CredentialsProfile::default(),
        };

        Ok(StorageBackend::PostgreSQL(PostgresConfig {
            connection_string: store.connection_string.clone(),
            host: store
                .host
                .clone()
                .or(profile.host)
                .unwrap_or_else(|| "localhost".to_string()),
            port: store.port.or(profile.port).unwrap_or(5432),
            user: store.user.clone().or(profile.user),
            password: store.password.clone().or(profile.password),
            database: store.database.clone().or(profile.database),
            max_connections: store.max_connections,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: chunkswarm/v1
kind: SwarmConfig
metadata:
  name: render-farm
spec:
  store:
    profile: cluster
    database: swarm_override
  profiles:
    cluster:
      host: db.cluster.local
      port: 6432
      user: swarm
      password: hunter2
      database: swarm
  sizing:
    cpus_to_leave: 70
    availability_divisor: 3
    worker_script: /opt/swarm/worker.sh
    grow_every: 25
  scheduler:
    kind: slurm
    queue: batch
  worker:
    command: ./process.sh
"#;

    #[test]
    fn test_default_manifest() {
        let manifest = SwarmConfigManifest::default();
        assert_eq!(manifest.api_version, "chunkswarm/v1");
        assert_eq!(manifest.kind, "SwarmConfig");
        assert_eq!(manifest.spec.store.backend, StoreBackendKind::Postgres);
        assert_eq!(manifest.spec.sizing.availability_divisor, 1);
        assert_eq!(manifest.spec.scheduler.kind, SchedulerKind::GridEngine);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let manifest = SwarmConfigManifest::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(manifest.metadata.name, "render-farm");
        assert_eq!(manifest.spec.sizing.cpus_to_leave, 70);
        assert_eq!(manifest.spec.sizing.availability_divisor, 3);
        assert_eq!(manifest.spec.sizing.grow_every, 25);
        assert_eq!(manifest.spec.sizing.probe_timeout_secs, 30);
        assert_eq!(manifest.spec.scheduler.kind, SchedulerKind::Slurm);
        assert_eq!(manifest.spec.scheduler.queue, "batch");
        assert_eq!(manifest.spec.worker.command.as_deref(), Some("./process.sh"));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_profile_fills_unset_fields() {
        let manifest = SwarmConfigManifest::from_yaml_str(SAMPLE).unwrap();
        match manifest.storage_backend().unwrap() {
            StorageBackend::PostgreSQL(pg) => {
                assert_eq!(pg.host, "db.cluster.local");
                assert_eq!(pg.port, 6432);
                assert_eq!(pg.user.as_deref(), Some("swarm"));
                assert_eq!(pg.password.as_deref(), Some("hunter2"));
                // explicit store field wins over the profile
                assert_eq!(pg.database.as_deref(), Some("swarm_override"));
                assert!(pg.connection_string.is_none());
            }
            other => panic!("Expected PostgreSQL backend, got {:?}", other),
        }
    }

    #[test]
    fn test_in_memory_backend() {
        let mut manifest = SwarmConfigManifest::default();
        manifest.spec.store.backend = StoreBackendKind::InMemory;
        assert!(matches!(manifest.storage_backend().unwrap(), StorageBackend::InMemory));
    }

    #[test]
    fn test_env_overrides() {
        let mut manifest = SwarmConfigManifest::default();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CHUNKSWARM_DATABASE_URL", "postgres://u:p@h/db"),
            ("CHUNKSWARM_CPUS_TO_LEAVE", "12"),
            ("CHUNKSWARM_AVAILABILITY_DIVISOR", "not-a-number"),
        ]);

        manifest.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            manifest.spec.store.connection_string.as_deref(),
            Some("postgres://u:p@h/db")
        );
        assert_eq!(manifest.spec.sizing.cpus_to_leave, 12);
        // invalid value ignored
        assert_eq!(manifest.spec.sizing.availability_divisor, 1);
    }

    #[test]
    fn test_validation() {
        let mut manifest = SwarmConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.sizing.availability_divisor = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.sizing.availability_divisor = 3;

        manifest.spec.sizing.worker_script = PathBuf::new();
        assert!(manifest.validate().is_err());
        manifest.spec.sizing.worker_script = PathBuf::from("worker.sh");

        manifest.spec.store.profile = Some("missing".to_string());
        assert!(manifest.validate().is_err());
        assert!(manifest.storage_backend().is_err());
        manifest.spec.store.profile = None;

        manifest.spec.scheduler.queue = "  ".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkswarm.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = SwarmConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(manifest.metadata.name, "render-farm");

        let missing = dir.path().join("missing.yaml");
        assert!(SwarmConfigManifest::load_or_default(Some(missing)).is_err());
    }
}
