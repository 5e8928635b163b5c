// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! UAA token service
//!
//! OAuth client for the platform's authorization server: password login,
//! refresh-token grant, and endpoint discovery through `/v2/info`.

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::domain::auth::{AccessToken, TokenError, TokenService};
use crate::domain::platform::PlatformInfo;

pub struct UaaTokenService {
    client: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl UaaTokenService {
    pub fn new(
        client: reqwest::Client,
        authorization_endpoint: &Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let token_url = authorization_endpoint
            .join("/oauth/token")
            .map_err(|e| TokenError::InvalidResponse(format!("Bad authorization endpoint: {}", e)))?;
        Ok(Self {
            client,
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Read the authorization endpoint advertised by the API.
    pub async fn discover(client: &reqwest::Client, api_endpoint: &Url) -> Result<Url, TokenError> {
        let info_url = api_endpoint
            .join("/v2/info")
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;
        debug!("Discovering authorization endpoint from {}", info_url);

        let response = client
            .get(info_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TokenError::Rejected(format!("HTTP {}", response.status())));
        }

        let info: PlatformInfo = response
            .json()
            .await
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;
        Url::parse(&info.authorization_endpoint)
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, TokenError> {
        let token = self
            .grant(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .await?;
        info!("Logged in as {}", username);
        Ok(token)
    }

    async fn grant(&self, form: &[(&str, &str)]) -> Result<AccessToken, TokenError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Rejected(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<AccessToken>()
            .await
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenService for UaaTokenService {
    async fn refresh(&self, current: &AccessToken) -> Result<AccessToken, TokenError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(TokenError::NoRefreshToken)?;

        let mut token = self
            .grant(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        // Servers may omit the refresh token when it did not rotate.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}
