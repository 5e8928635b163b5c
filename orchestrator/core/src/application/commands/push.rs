// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Push Orchestrator
//!
//! Deploys an application from its manifest and content root.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Sequence the deployment stages and build the summary
//!
//! # Paths
//!
//! - **Create** (no guid yet): create application + bind route, with
//!   compensating rollback, then upload bits, then bind services.
//! - **Update** (guid known): apply the manifest parameters, upload bits,
//!   then restart.
//!
//! Every stage runs under
//! [`CredentialRetry`](crate::application::retry::CredentialRetry); the
//! create-and-route pairing wraps its own requests. The first failing stage
//! ends the push, and on success the aggregate ends with a summary outcome.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::apps::UpdateApplication;
use super::lifecycle::Restart;
use super::payload;
use super::provision::CreateApplicationWithRoute;
use super::services::BindServices;
use super::upload::UploadBits;
use crate::application::context::OperationContext;
use crate::application::operation::Operation;
use crate::application::retry::OperationExt;
use crate::application::rollback::CompensatingRollback;
use crate::domain::manifest::Application;
use crate::domain::outcome::{AggregateOutcome, OperationError, Outcome};
use crate::domain::platform::{AppEntity, Resource, RouteBinding, RouteEntity};
use crate::domain::session::{SpaceRef, TargetSummary};

/// Final payload of a successful push.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentSummary {
    pub target: TargetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_url: Option<String>,
    pub app: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Resource<RouteEntity>>,
    pub timeout: u32,
}

enum PushPath {
    Create,
    Update,
}

pub struct PushApplication<'a> {
    app: &'a Application,
}

impl<'a> PushApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }

    async fn create(&self, ctx: &OperationContext, aggregate: &mut AggregateOutcome) -> Option<Summary> {
        // Credential retry happens per request inside the pairing.
        let created = CompensatingRollback::new(CreateApplicationWithRoute::new(self.app))
            .run(ctx)
            .await;

        let app_payload = created.first().and_then(|o| o.payload().cloned());
        let guid = created
            .first()
            .and_then(|o| o.decode::<Resource<AppEntity>>().ok())
            .map(|r| r.metadata.guid);
        let binding = created
            .last()
            .and_then(|o| o.decode::<RouteBinding>().ok())
            .unwrap_or_default();
        if !aggregate.absorb(created) {
            return None;
        }

        // CreateApplicationWithRoute fails the aggregate when no guid decodes.
        let deployed = self.app.clone().with_guid(guid.unwrap_or_default());

        if !aggregate.absorb(UploadBits::new(&deployed).with_credential_retry().run(ctx).await) {
            return None;
        }
        if !aggregate.absorb(BindServices::new(&deployed).with_credential_retry().run(ctx).await) {
            return None;
        }

        Some(Summary {
            app_guid: deployed.guid.unwrap_or_default(),
            app: app_payload.unwrap_or(Value::Null),
            binding,
        })
    }

    async fn update(&self, ctx: &OperationContext, aggregate: &mut AggregateOutcome) -> Option<Summary> {
        let updated = UpdateApplication::new(self.app)
            .with_credential_retry()
            .run(ctx)
            .await;
        if !aggregate.absorb(updated) {
            return None;
        }
        if !aggregate.absorb(UploadBits::new(self.app).with_credential_retry().run(ctx).await) {
            return None;
        }

        let restarted = Restart::new(self.app).with_credential_retry().run(ctx).await;
        let refreshed = restarted
            .outcomes()
            .iter()
            .rev()
            .find(|o| o.decode::<Resource<AppEntity>>().is_ok())
            .and_then(|o| o.payload().cloned());
        if !aggregate.absorb(restarted) {
            return None;
        }

        Some(Summary {
            app_guid: self.app.guid.clone().unwrap_or_default(),
            app: refreshed.unwrap_or(Value::Null),
            binding: RouteBinding::default(),
        })
    }

    fn summarize(&self, ctx: &OperationContext, space: &SpaceRef, summary: Summary) -> Outcome {
        let session = ctx.session();
        let manage_url = match (session.manage_url(), session.org()) {
            (Some(base), Some(org)) => Some(format!(
                "{}#/resources/appGuid={}&orgGuid={}&spaceGuid={}",
                base, summary.app_guid, org.guid, space.guid
            )),
            _ => None,
        };

        payload(&DeploymentSummary {
            target: session.summary(),
            manage_url,
            app: summary.app,
            domain: summary.binding.domain,
            route: summary.binding.route,
            timeout: self.app.timeout_secs(),
        })
    }
}

struct Summary {
    app_guid: String,
    app: Value,
    binding: RouteBinding,
}

pub struct PushParams {
    path: PushPath,
    space: SpaceRef,
}

#[async_trait]
impl<'a> Operation for PushApplication<'a> {
    type Params = PushParams;
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Push application {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<PushParams, OperationError> {
        let space = ctx.session().require_space()?;
        if self.app.content_root.is_none() {
            return Err(OperationError::bad_request(format!(
                "No content to deploy for {}",
                self.app.name
            )));
        }
        self.app.memory_mb()?;

        let path = match self.app.guid {
            Some(_) => PushPath::Update,
            None => PushPath::Create,
        };
        Ok(PushParams { path, space })
    }

    async fn execute(&self, ctx: &OperationContext, params: PushParams) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();

        let summary = match params.path {
            PushPath::Create => {
                info!("Pushing new application {}", self.app.name);
                self.create(ctx, &mut aggregate).await
            }
            PushPath::Update => {
                info!("Pushing update of application {}", self.app.name);
                self.update(ctx, &mut aggregate).await
            }
        };

        if let Some(summary) = summary {
            aggregate.push(self.summarize(ctx, &params.space, summary));
            info!("Application {} pushed", self.app.name);
        }
        aggregate
    }
}
