// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Client Configuration
//!
//! YAML configuration for the push client: target endpoint, credentials,
//! HTTP and polling settings.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Discovery, environment overrides and validation
//!
//! # Example
//!
//! ```yaml
//! api_endpoint: https://api.run.example.com
//! organization: acme
//! space: dev
//! auth:
//!   refresh_token: eyJhbGciOi...
//! http:
//!   timeout: 5m
//! poll:
//!   interval: 2s
//!   max_attempts: 150
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Web console base used to build the `ManageUrl` of a push summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub poll: PollSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            manage_url: None,
            organization: None,
            space: None,
            auth: AuthConfig::default(),
            http: HttpConfig::default(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Authorization server base. Discovered from `/v2/info` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            token_endpoint: None,
            client_id: default_client_id(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
        }
    }
}

/// Budget for long-running job polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_api_endpoint() -> String {
    "https://api.run.pivotal.io".to_string()
}

fn default_client_id() -> String {
    "cf".to_string()
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_max_attempts() -> u32 {
    150
}

impl ClientConfig {
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

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. CFPUSH_CONFIG_PATH environment variable
    /// 2. ./cfpush.yaml (working directory)
    /// 3. ~/.cfpush/config.yaml (user home)
    /// 4. /etc/cfpush/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CFPUSH_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./cfpush.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cfpush").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/cfpush/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", path);
                Self::from_yaml_file(path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CFPUSH_API_ENDPOINT") {
            tracing::info!("Environment override: CFPUSH_API_ENDPOINT={}", val);
            self.api_endpoint = val;
        }
        if let Ok(val) = std::env::var("CFPUSH_ORG") {
            tracing::info!("Environment override: CFPUSH_ORG={}", val);
            self.organization = Some(val);
        }
        if let Ok(val) = std::env::var("CFPUSH_SPACE") {
            tracing::info!("Environment override: CFPUSH_SPACE={}", val);
            self.space = Some(val);
        }
        // Tokens are never echoed.
        if let Ok(val) = std::env::var("CFPUSH_ACCESS_TOKEN") {
            tracing::info!("Environment override: CFPUSH_ACCESS_TOKEN");
            self.auth.access_token = Some(val);
        }
        if let Ok(val) = std::env::var("CFPUSH_REFRESH_TOKEN") {
            tracing::info!("Environment override: CFPUSH_REFRESH_TOKEN");
            self.auth.refresh_token = Some(val);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let endpoint = self.endpoint_url()?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "Invalid api_endpoint scheme '{}'. Must be http or https",
                endpoint.scheme()
            );
        }

        if let Some(manage) = &self.manage_url {
            Url::parse(manage)
                .map_err(|e| anyhow::anyhow!("Invalid manage_url '{}': {}", manage, e))?;
        }

        if let Some(token_endpoint) = &self.auth.token_endpoint {
            Url::parse(token_endpoint).map_err(|e| {
                anyhow::anyhow!("Invalid auth.token_endpoint '{}': {}", token_endpoint, e)
            })?;
        }

        if self.auth.client_id.is_empty() {
            anyhow::bail!("auth.client_id cannot be empty");
        }

        if self.poll.max_attempts == 0 {
            anyhow::bail!("poll.max_attempts must be greater than zero");
        }

        Ok(())
    }

    pub fn endpoint_url(&self) -> anyhow::Result<Url> {
        if self.api_endpoint.trim().is_empty() {
            anyhow::bail!("api_endpoint cannot be empty");
        }
        Url::parse(&self.api_endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid api_endpoint '{}': {}", self.api_endpoint, e))
    }
}
