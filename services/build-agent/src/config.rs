// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Agent configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use coordinator_client::{ClientConfig, DEFAULT_UPLOAD_CHUNK_SIZE};

/// Default root holding one build directory per task
const DEFAULT_BUILD_PATH: &str = "/srv/build";

/// Default seconds between health checks
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 300;

/// Default timeout for ordinary coordinator requests (seconds)
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Container cleanup run after the clean paths are emptied
const DEFAULT_PRUNE_COMMAND: &[&str] = &["docker", "system", "prune", "--force", "--all", "--volumes"];

/// Agent configuration loaded from environment variables or a JSON file
///
/// `from_env()` is the primary source. When `AGENT_CONFIG` names a file,
/// `load()` reads that instead; fields absent from the file keep their
/// defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Coordinator base URL
    pub coordinator_url: String,
    pub api_token: Option<String>,
    /// Key identifying this agent to the coordinator
    pub agent_key: String,
    /// Extra CA bundle trusted on top of the system roots
    pub tls_ca_file: Option<PathBuf>,
    /// Timeout for ordinary requests; 0 waits indefinitely
    pub client_timeout_secs: u64,
    pub upload_chunk_size: usize,
    /// Upload bandwidth cap in KiB/s; 0 disables it
    pub upload_rate_limit_kib: u64,
    /// Root holding one build directory per task
    pub build_path: PathBuf,
    pub health_check_interval_secs: u64,
    /// Directories emptied by the host sweep
    pub health_check_clean_paths: Vec<PathBuf>,
    /// Program and arguments run after the sweep; empty disables it
    pub prune_command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            coordinator_url: String::new(),
            api_token: None,
            agent_key: String::new(),
            tls_ca_file: None,
            client_timeout_secs: DEFAULT_CLIENT_TIMEOUT_SECS,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            upload_rate_limit_kib: 0,
            build_path: PathBuf::from(DEFAULT_BUILD_PATH),
            health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            health_check_clean_paths: Vec::new(),
            prune_command: DEFAULT_PRUNE_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AgentConfig {
    /// Load from `AGENT_CONFIG` if set, otherwise from the environment
    pub async fn load() -> Result<Self> {
        match std::env::var("AGENT_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path)).await,
            _ => Self::from_env(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let coordinator_url =
            var("COORDINATOR_URL").context("COORDINATOR_URL environment variable required")?;

        let agent_key = var("AGENT_KEY").context("AGENT_KEY environment variable required")?;

        let api_token = var("API_TOKEN").filter(|s| !s.is_empty());
        let tls_ca_file = var("TLS_CA_FILE").filter(|s| !s.is_empty()).map(PathBuf::from);

        let client_timeout_secs = parse_or(&var, "CLIENT_TIMEOUT_SECS", defaults.client_timeout_secs)?;
        let upload_chunk_size = parse_or(&var, "UPLOAD_CHUNK_SIZE", defaults.upload_chunk_size)?;
        let upload_rate_limit_kib = parse_or(&var, "UPLOAD_RATE_LIMIT_KIB", 0)?;
        let health_check_interval_secs = parse_or(
            &var,
            "HEALTH_CHECK_INTERVAL_SECS",
            defaults.health_check_interval_secs,
        )?;

        let build_path = var("BUILD_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.build_path);

        // Comma-separated: "/var/cache/a,/tmp/b"
        let health_check_clean_paths = var("HEALTH_CHECK_CLEAN_PATHS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        // Whitespace-separated program and arguments; set but empty disables
        let prune_command = var("PRUNE_COMMAND")
            .map(|v| v.split_whitespace().map(|s| s.to_string()).collect())
            .unwrap_or(defaults.prune_command);

        Ok(Self {
            coordinator_url,
            api_token,
            agent_key,
            tls_ca_file,
            client_timeout_secs,
            upload_chunk_size,
            upload_rate_limit_kib,
            build_path,
            health_check_interval_secs,
            health_check_clean_paths,
            prune_command,
        })
    }

    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.coordinator_url.is_empty() {
            anyhow::bail!("{}: coordinator_url is required", path.display());
        }
        Ok(config)
    }

    /// Settings for the coordinator client
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.coordinator_url.clone());
        config.token = self.api_token.clone();
        config.trusted_ca = self.tls_ca_file.clone();
        config.timeout = (self.client_timeout_secs > 0)
            .then(|| Duration::from_secs(self.client_timeout_secs));
        config.upload_chunk_size = self.upload_chunk_size;
        config.upload_rate_limit =
            (self.upload_rate_limit_kib > 0).then(|| self.upload_rate_limit_kib.saturating_mul(1024));
        config
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}

fn parse_or<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        None => Ok(default),
    }
}
