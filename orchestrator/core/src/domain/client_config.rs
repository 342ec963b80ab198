// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Client Configuration Types
//
// Defines the configuration schema for a CAD IO client session:
// - Service endpoints (resource API, authentication)
// - Client credentials (inline or "env:VAR_NAME")
// - Work item polling cadence and optional deadline
// - Scratch directory for bundle packaging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://developer.api.autodesk.com/autocad.io/v1/";
pub const DEFAULT_AUTH_URL: &str = "https://developer.api.autodesk.com/authentication/v1/authenticate";
pub const DEFAULT_ENGINE_VERSION: &str = "20.0";

const CONFIG_PATH_ENV: &str = "CADIO_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the resource API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Token endpoint for the client credentials exchange
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Client ID (supports "env:VAR_NAME")
    #[serde(default)]
    pub client_id: String,

    /// Client secret (supports "env:VAR_NAME")
    #[serde(default)]
    pub client_secret: String,

    /// Engine version stamped on new activities and packages
    #[serde(default = "default_engine_version")]
    pub required_engine_version: String,

    /// Delay between work item status fetches
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Give up waiting for a work item after this long (unbounded when unset)
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub poll_timeout: Option<Duration>,

    /// Per-request HTTP timeout
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Where bundle archives and extracted manifests are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_engine_version() -> String {
    DEFAULT_ENGINE_VERSION.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_url: default_auth_url(),
            client_id: String::new(),
            client_secret: String::new(),
            required_engine_version: default_engine_version(),
            poll_interval: default_poll_interval(),
            poll_timeout: None,
            http_timeout: default_http_timeout(),
            scratch_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate config files, most specific first: `$CADIO_CONFIG_PATH`,
    /// the working directory, the user's home, then the system location.
    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .into_iter()
            .collect();
        candidates.push(PathBuf::from("cadio-config.yaml"));
        candidates.extend(dirs::home_dir().map(|home| home.join(".cadio").join("config.yaml")));
        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/cadio/config.yaml"));
        #[cfg(windows)]
        candidates.push(PathBuf::from(r"C:\ProgramData\Cadio\config.yaml"));
        candidates
    }

    /// First existing config file, if any
    pub fn discover_config() -> Option<PathBuf> {
        Self::config_candidates().into_iter().find(|path| path.is_file())
    }

    /// Read `explicit_path` when given (a missing file is an error), else the
    /// discovered file, else defaults. Environment overrides always win.
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let source = explicit_path.or_else(Self::discover_config);

        let mut config = match source {
            Some(path) => {
                tracing::info!(path = ?path, "Loading client configuration");
                Self::from_yaml_file(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
            }
            None => {
                tracing::warn!("No cadio config file found, falling back to defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CADIO_CLIENT_ID") {
            tracing::info!("Environment override: CADIO_CLIENT_ID");
            self.client_id = val;
        }
        if let Ok(val) = std::env::var("CADIO_CLIENT_SECRET") {
            tracing::info!("Environment override: CADIO_CLIENT_SECRET");
            self.client_secret = val;
        }
        if let Ok(val) = std::env::var("CADIO_API_URL") {
            tracing::info!("Environment override: CADIO_API_URL={}", val);
            self.api_base_url = val;
        }
    }

    /// Client ID with any "env:VAR_NAME" indirection resolved
    pub fn resolved_client_id(&self) -> anyhow::Result<String> {
        resolve_secret(&self.client_id, "client_id")
    }

    pub fn resolved_client_secret(&self) -> anyhow::Result<String> {
        resolve_secret(&self.client_secret, "client_secret")
    }

    /// Scratch directory, falling back to the OS temp dir
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [("api_base_url", &self.api_base_url), ("auth_url", &self.auth_url)] {
            let parsed = url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL ('{}'): {}", field, value, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must use http or https, got '{}'", field, parsed.scheme());
            }
        }

        if self.client_id.is_empty() {
            anyhow::bail!("client_id cannot be empty");
        }
        if self.client_secret.is_empty() {
            anyhow::bail!("client_secret cannot be empty");
        }
        if self.required_engine_version.is_empty() {
            anyhow::bail!("required_engine_version cannot be empty");
        }
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than zero");
        }
        if let Some(timeout) = self.poll_timeout {
            if timeout < self.poll_interval {
                anyhow::bail!(
                    "poll_timeout ({:?}) is shorter than poll_interval ({:?})",
                    timeout,
                    self.poll_interval
                );
            }
        }

        Ok(())
    }
}

fn resolve_secret(value: &str, field: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("{} refers to unset environment variable {}", field, var)),
        None => Ok(value.to_string()),
    }
}
