// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operation Context
//!
//! Collaborators handed to every operation, and the platform API helper
//! that turns requests into [`Outcome`]s.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Resolve URLs, attach credentials, map responses
//! - **Related:** `domain::transport` (wire seam), `domain::session` (state)

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::application::poller::{Sleeper, TokioSleeper};
use crate::domain::archive::Archiver;
use crate::domain::auth::TokenService;
use crate::domain::config::PollSettings;
use crate::domain::outcome::{OperationError, Outcome};
use crate::domain::platform::{Page, Resource};
use crate::domain::session::Session;
use crate::domain::transport::{HttpMethod, HttpRequest, MultipartField, RequestBody, Transport};

pub struct OperationContext {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    archiver: Arc<dyn Archiver>,
    token_service: Option<Arc<dyn TokenService>>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollSettings,
}

impl OperationContext {
    pub fn new(
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            session,
            transport,
            archiver,
            token_service: None,
            sleeper: Arc::new(TokioSleeper),
            poll: PollSettings::default(),
        }
    }

    pub fn with_token_service(mut self, service: Arc<dyn TokenService>) -> Self {
        self.token_service = Some(service);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn archiver(&self) -> &dyn Archiver {
        self.archiver.as_ref()
    }

    pub fn token_service(&self) -> Option<&dyn TokenService> {
        self.token_service.as_deref()
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    pub fn api(&self) -> PlatformApi<'_> {
        PlatformApi { ctx: self }
    }
}

/// Authenticated access to the platform's v2 API.
pub struct PlatformApi<'a> {
    ctx: &'a OperationContext,
}

impl<'a> PlatformApi<'a> {
    /// Resolve `path` (absolute path or full URL) against the endpoint.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, OperationError> {
        let mut url = self.ctx.session.endpoint().join(path).map_err(|e| {
            OperationError::bad_request(format!("Invalid platform URL: {}", path))
                .with_cause(e.to_string())
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn send(&self, method: HttpMethod, url: Url, body: RequestBody) -> Outcome {
        let Some(credential) = self.ctx.session.credential() else {
            return OperationError::unauthorized("Not authenticated")
                .with_payload(json!({"error_code": "CF-NotAuthenticated"}))
                .into();
        };

        debug!("{} {}", method, url);
        let mut request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .header("Authorization", credential.token.authorization_header());
        if matches!(body, RequestBody::Json(_)) {
            request = request.header("Content-Type", "application/json");
        }

        match self.ctx.transport.execute(request.body(body)).await {
            Ok(response) => Outcome::from_response(response.status, response.body),
            Err(e) => {
                warn!("Transport failure talking to platform: {}", e);
                OperationError::gateway("Could not connect to platform", e.to_string()).into()
            }
        }
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Outcome {
        match self.url(path, query) {
            Ok(url) => self.send(method, url, body).await,
            Err(e) => e.into(),
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Outcome {
        self.call(HttpMethod::Get, path, query, RequestBody::Empty).await
    }

    pub async fn post_json(&self, path: &str, query: &[(&str, &str)], body: Value) -> Outcome {
        self.call(HttpMethod::Post, path, query, RequestBody::Json(body)).await
    }

    pub async fn put_json(&self, path: &str, query: &[(&str, &str)], body: Value) -> Outcome {
        self.call(HttpMethod::Put, path, query, RequestBody::Json(body)).await
    }

    pub async fn put_empty(&self, path: &str, query: &[(&str, &str)]) -> Outcome {
        self.call(HttpMethod::Put, path, query, RequestBody::Empty).await
    }

    pub async fn put_multipart(
        &self,
        path: &str,
        query: &[(&str, &str)],
        fields: Vec<MultipartField>,
    ) -> Outcome {
        self.call(HttpMethod::Put, path, query, RequestBody::Multipart(fields))
            .await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Outcome {
        self.call(HttpMethod::Delete, path, query, RequestBody::Empty).await
    }

    /// Fetch every page of a listing by following `next_url`.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Resource<T>>, OperationError> {
        let mut url = self.url(path, query)?;
        let mut resources = Vec::new();

        loop {
            let page: Page<T> = self
                .send(HttpMethod::Get, url, RequestBody::Empty)
                .await
                .decode()?;
            resources.extend(page.resources);

            match page.next_url {
                Some(next) if !next.is_empty() => url = self.url(&next, &[])?,
                _ => return Ok(resources),
            }
        }
    }
}
