// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application resource commands: lookup, create, update, delete.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::payload;
use crate::application::context::{OperationContext, PlatformApi};
use crate::application::operation::Operation;
use crate::domain::manifest::Application;
use crate::domain::outcome::{OperationError, Outcome};
use crate::domain::platform::{AppEntity, Page, Resource};
use crate::domain::session::SpaceRef;

/// Look up an application by name in the targeted space.
pub(crate) async fn find_application(
    api: &PlatformApi<'_>,
    space: &SpaceRef,
    name: &str,
) -> Result<Option<Resource<AppEntity>>, OperationError> {
    let query = format!("name:{}", name);
    let page: Page<AppEntity> = api
        .get(
            &format!("/v2/spaces/{}/apps", space.guid),
            &[("q", query.as_str()), ("inline-relations-depth", "1")],
        )
        .await
        .decode()?;
    Ok(page.resources.into_iter().next())
}

/// Fetch an application by name. Success carries the app resource.
pub struct GetApplication<'a> {
    name: &'a str,
}

impl<'a> GetApplication<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl<'a> Operation for GetApplication<'a> {
    type Params = SpaceRef;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Get application {}", self.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<SpaceRef, OperationError> {
        if self.name.trim().is_empty() {
            return Err(OperationError::bad_request("Application name is required"));
        }
        ctx.session().require_space()
    }

    async fn execute(&self, ctx: &OperationContext, space: SpaceRef) -> Outcome {
        match find_application(&ctx.api(), &space, self.name).await {
            Ok(Some(app)) => payload(&app),
            Ok(None) => OperationError::not_found("Application not found").into(),
            Err(e) => e.into(),
        }
    }
}

pub struct CreateParams {
    body: Value,
}

/// `POST /v2/apps` from the manifest-derived application parameters.
pub struct CreateApplication<'a> {
    app: &'a Application,
}

impl<'a> CreateApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for CreateApplication<'a> {
    type Params = CreateParams;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Create application {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<CreateParams, OperationError> {
        let space = ctx.session().require_space()?;
        if self.app.name.trim().is_empty() {
            return Err(OperationError::bad_request("Application name is required"));
        }
        let memory = self.app.memory_mb()?;

        let body = json!({
            "space_guid": space.guid,
            "name": self.app.name,
            "instances": self.app.instances(),
            "buildpack": self.app.manifest.buildpack,
            "command": self.app.manifest.command,
            "memory": memory,
            "stack_guid": Value::Null,
            "environment_json": self.app.environment(),
        });
        Ok(CreateParams { body })
    }

    async fn execute(&self, ctx: &OperationContext, params: CreateParams) -> Outcome {
        let outcome = ctx.api().post_json("/v2/apps", &[], params.body).await;
        if let Ok(created) = outcome.decode::<Resource<AppEntity>>() {
            info!("Created application {} ({})", self.app.name, created.guid());
        }
        outcome
    }
}

pub struct UpdateParams {
    path: String,
    body: Value,
}

/// `PUT /v2/apps/{guid}` with the manifest parameters of an existing
/// application. A missing `command` is sent empty so a removed start
/// command is cleared on the platform.
pub struct UpdateApplication<'a> {
    app: &'a Application,
}

impl<'a> UpdateApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for UpdateApplication<'a> {
    type Params = UpdateParams;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Update application {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<UpdateParams, OperationError> {
        let guid = self.app.require_guid()?;
        let memory = self.app.memory_mb()?;

        let body = json!({
            "name": self.app.name,
            "instances": self.app.instances(),
            "command": self.app.manifest.command.as_deref().unwrap_or_default(),
            "memory": memory,
            "environment_json": self.app.environment(),
            "buildpack": self.app.manifest.buildpack,
        });
        Ok(UpdateParams {
            path: format!("/v2/apps/{}", guid),
            body,
        })
    }

    async fn execute(&self, ctx: &OperationContext, params: UpdateParams) -> Outcome {
        let outcome = ctx
            .api()
            .put_json(
                &params.path,
                &[("async", "true"), ("inline-relations-depth", "1")],
                params.body,
            )
            .await;
        if outcome.is_ok() {
            info!("Updated application {}", self.app.name);
        }
        outcome
    }
}

/// Delete an application, and everything bound to it, by name.
pub struct DeleteApplication<'a> {
    app: &'a Application,
}

impl<'a> DeleteApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for DeleteApplication<'a> {
    type Params = SpaceRef;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Delete application {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<SpaceRef, OperationError> {
        ctx.session().require_space()
    }

    async fn execute(&self, ctx: &OperationContext, space: SpaceRef) -> Outcome {
        let api = ctx.api();
        let found = match find_application(&api, &space, &self.app.name).await {
            Ok(Some(app)) => app,
            Ok(None) => return OperationError::not_found("Application not found").into(),
            Err(e) => return e.into(),
        };

        let outcome = api
            .delete(
                &format!("/v2/apps/{}", found.guid()),
                &[("recursive", "true")],
            )
            .await;
        if outcome.is_ok() {
            info!("Deleted application {} ({})", self.app.name, found.guid());
        }
        outcome
    }
}
