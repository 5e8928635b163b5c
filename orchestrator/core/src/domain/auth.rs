// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Access credentials and the token service seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth token pair issued by the platform's authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Value of the `Authorization` header for platform requests.
    pub fn authorization_header(&self) -> String {
        format!("bearer {}", self.access_token)
    }
}

/// Obtains a fresh credential for an expired one.
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn refresh(&self, current: &AccessToken) -> Result<AccessToken, TokenError>;
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token endpoint rejected the request: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}
