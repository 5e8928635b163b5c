// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Target Session
//!
//! Connection state shared by every operation of a request: the platform
//! endpoint, the targeted organization and space, and the access
//! credential.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Versioned credential cell with single-flight refresh
//!
//! The credential carries a monotonically increasing version. A caller that
//! saw a 401 records the version it used; if another task replaced the
//! credential while this caller waited on the refresh guard, the newer
//! credential is reused instead of refreshing twice.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::auth::{AccessToken, TokenError, TokenService};
use super::outcome::OperationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgRef {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRef {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: AccessToken,
    pub version: u64,
}

/// `Target` block of a push summary.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Org", skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgRef>,
    #[serde(rename = "Space", skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceRef>,
}

#[derive(Debug)]
pub struct Session {
    endpoint: Url,
    manage_url: Option<Url>,
    org: RwLock<Option<OrgRef>>,
    space: RwLock<Option<SpaceRef>>,
    credential: RwLock<Option<Credential>>,
    refresh_guard: Mutex<()>,
}

impl Session {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            manage_url: None,
            org: RwLock::new(None),
            space: RwLock::new(None),
            credential: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn with_manage_url(mut self, manage_url: Url) -> Self {
        self.manage_url = Some(manage_url);
        self
    }

    pub fn with_credential(self, token: AccessToken) -> Self {
        *self.credential.write() = Some(Credential { token, version: 0 });
        self
    }

    pub fn with_target(self, org: OrgRef, space: SpaceRef) -> Self {
        *self.org.write() = Some(org);
        *self.space.write() = Some(space);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn manage_url(&self) -> Option<&Url> {
        self.manage_url.as_ref()
    }

    pub fn org(&self) -> Option<OrgRef> {
        self.org.read().clone()
    }

    pub fn space(&self) -> Option<SpaceRef> {
        self.space.read().clone()
    }

    /// Selecting a new organization clears the space, which belongs to it.
    pub fn set_org(&self, org: OrgRef) {
        let mut current = self.org.write();
        if current.as_ref().map(|o| &o.guid) != Some(&org.guid) {
            *self.space.write() = None;
        }
        *current = Some(org);
    }

    pub fn set_space(&self, space: SpaceRef) {
        *self.space.write() = Some(space);
    }

    pub fn require_org(&self) -> Result<OrgRef, OperationError> {
        self.org()
            .ok_or_else(|| OperationError::bad_request("No organization targeted"))
    }

    pub fn require_space(&self) -> Result<SpaceRef, OperationError> {
        self.space()
            .ok_or_else(|| OperationError::bad_request("No space targeted"))
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    pub fn set_credential(&self, token: AccessToken) -> Credential {
        let mut cell = self.credential.write();
        let version = cell.as_ref().map(|c| c.version + 1).unwrap_or(0);
        let credential = Credential { token, version };
        *cell = Some(credential.clone());
        credential
    }

    /// Replace the credential observed at `observed_version`.
    ///
    /// Concurrent callers are serialized; only the first one reaches the
    /// token service.
    pub async fn refresh_credential(
        &self,
        observed_version: u64,
        service: &dyn TokenService,
    ) -> Result<Credential, TokenError> {
        let _guard = self.refresh_guard.lock().await;

        let current = self.credential().ok_or(TokenError::NoRefreshToken)?;
        if current.version > observed_version {
            debug!(
                "Credential already refreshed to version {}, reusing",
                current.version
            );
            return Ok(current);
        }

        let fresh = service.refresh(&current.token).await?;
        let credential = self.set_credential(fresh);
        info!("Access credential refreshed (version {})", credential.version);
        Ok(credential)
    }

    pub fn summary(&self) -> TargetSummary {
        TargetSummary {
            url: self.endpoint.to_string(),
            org: self.org(),
            space: self.space(),
        }
    }
}
