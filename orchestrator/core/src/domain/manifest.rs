// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Manifest
//!
//! Typed view of an application deployment manifest (YAML or JSON).
//! Only decoding happens here; the manifest arrives already resolved.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Decode manifests and derive deployment parameters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::outcome::OperationError;

pub const DEFAULT_MEMORY_MB: u64 = 1024;
pub const DEFAULT_INSTANCES: u32 = 1;
pub const DEFAULT_START_TIMEOUT_SECS: u32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub applications: Vec<ApplicationManifest>,

    /// Environment shared by every application in the manifest.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let manifest = serde_yaml::from_str(yaml)?;
        Ok(manifest)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let manifest = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Load a manifest file, choosing the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplicationManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub no_route: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServiceDeclarations>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,
}

/// Scalar that manifests write either as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

/// The two accepted shapes of the `services` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceDeclarations {
    /// Instances to provision from the catalog, keyed by instance name.
    Provisioned(BTreeMap<String, ServiceSpec>),
    /// Names of instances that already exist in the target space.
    Existing(Vec<String>),
}

impl ServiceDeclarations {
    pub fn is_empty(&self) -> bool {
        match self {
            ServiceDeclarations::Provisioned(map) => map.is_empty(),
            ServiceDeclarations::Existing(names) => names.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub provider: String,
    pub plan: String,
}

impl ServiceSpec {
    /// Catalog label of the offering; `type` wins over `label`.
    pub fn offering(&self) -> Option<&str> {
        self.kind.as_deref().or(self.label.as_deref())
    }
}

/// Application being deployed, with manifest-derived parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    /// Platform identifier, known once the application exists.
    pub guid: Option<String>,
    pub name: String,
    pub manifest: ApplicationManifest,
    pub global_env: BTreeMap<String, Value>,
    pub content_root: Option<PathBuf>,
}

impl Application {
    /// Build from the first application declared in `manifest`.
    pub fn from_manifest(
        manifest: &Manifest,
        content_root: Option<PathBuf>,
    ) -> Result<Self, OperationError> {
        let app = manifest
            .applications
            .first()
            .ok_or_else(|| OperationError::bad_request("Manifest declares no applications"))?;

        Ok(Self {
            guid: None,
            name: app.name.clone(),
            manifest: app.clone(),
            global_env: manifest.env.clone(),
            content_root,
        })
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn require_guid(&self) -> Result<&str, OperationError> {
        self.guid.as_deref().ok_or_else(|| {
            OperationError::bad_request(format!("Application {} has not been created", self.name))
        })
    }

    pub fn instances(&self) -> u32 {
        self.manifest.instances.unwrap_or(DEFAULT_INSTANCES)
    }

    pub fn memory_mb(&self) -> Result<u64, OperationError> {
        match &self.manifest.memory {
            None => Ok(DEFAULT_MEMORY_MB),
            Some(Quantity::Number(mb)) => Ok(*mb),
            Some(Quantity::Text(text)) => parse_memory_mb(text),
        }
    }

    /// Route host: the declared host, or the slugified application name.
    pub fn host(&self) -> String {
        match &self.manifest.host {
            Some(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => slugify(&self.name),
        }
    }

    pub fn timeout_secs(&self) -> u32 {
        self.manifest.timeout.unwrap_or(DEFAULT_START_TIMEOUT_SECS)
    }

    /// Global environment overlaid with the application's own entries.
    pub fn environment(&self) -> BTreeMap<String, Value> {
        let mut env = self.global_env.clone();
        env.extend(self.manifest.env.clone());
        env
    }
}

/// Parse a memory quota into megabytes.
///
/// Accepts a bare number (megabytes) or a number followed by `M`, `MB`,
/// `G` or `GB`, case-insensitive.
pub fn parse_memory_mb(text: &str) -> Result<u64, OperationError> {
    let normalized = text.trim().to_ascii_uppercase();
    let split = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (digits, unit) = normalized.split_at(split);

    let invalid = || OperationError::bad_request(format!("Invalid memory quota: {}", text));
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    match unit.trim() {
        "" | "M" | "MB" => Ok(amount),
        "G" | "GB" => amount.checked_mul(1024).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Turn an application name into a route host.
///
/// Whitespace runs become `-`; anything other than ASCII word characters and
/// `-` is dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        }
    }
    slug
}
