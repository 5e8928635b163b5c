// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Operation context wiring
//!
//! Builds the session and collaborators for one CLI invocation from the
//! loaded [`ClientConfig`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use cfpush_core::application::{OperationContext, TokioSleeper};
use cfpush_core::domain::auth::AccessToken;
use cfpush_core::domain::config::ClientConfig;
use cfpush_core::domain::session::Session;
use cfpush_core::infrastructure::{ReqwestTransport, UaaTokenService, ZipArchiver};

/// Build the session for `config`. No network access.
pub fn session(config: &ClientConfig) -> Result<Session> {
    let mut session = Session::new(config.endpoint_url()?);

    if let Some(manage) = &config.manage_url {
        let manage = Url::parse(manage).with_context(|| format!("Invalid manage_url '{}'", manage))?;
        session = session.with_manage_url(manage);
    }

    if let Some(access_token) = &config.auth.access_token {
        let mut token = AccessToken::new(access_token.clone());
        token.refresh_token = config.auth.refresh_token.clone();
        session = session.with_credential(token);
    }

    Ok(session)
}

/// Build a ready-to-use operation context.
///
/// A token service is only configured when a refresh token is available;
/// without one an expired credential cannot be renewed anyway.
pub async fn connect(config: &ClientConfig) -> Result<OperationContext> {
    let session = session(config)?;
    if session.credential().is_none() {
        warn!("No access token configured; platform requests will be rejected");
    }

    let http = reqwest::Client::builder()
        .timeout(config.http.timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let endpoint = session.endpoint().clone();
    let mut ctx = OperationContext::new(
        Arc::new(session),
        Arc::new(ReqwestTransport::with_client(http.clone())),
        Arc::new(ZipArchiver::new()),
    )
    .with_sleeper(Arc::new(TokioSleeper))
    .with_poll_settings(config.poll);

    if config.auth.refresh_token.is_some() {
        let authorization_endpoint = match &config.auth.token_endpoint {
            Some(configured) => Url::parse(configured)
                .with_context(|| format!("Invalid auth.token_endpoint '{}'", configured))?,
            None => UaaTokenService::discover(&http, &endpoint)
                .await
                .context("Failed to discover the authorization endpoint")?,
        };
        debug!("Using authorization endpoint {}", authorization_endpoint);

        let tokens = UaaTokenService::new(
            http,
            &authorization_endpoint,
            config.auth.client_id.clone(),
            config.auth.client_secret.clone(),
        )?;
        ctx = ctx.with_token_service(Arc::new(tokens));
    }

    Ok(ctx)
}
