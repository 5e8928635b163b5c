// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Lifecycle
//!
//! Start, stop and restart an application, optionally waiting until all
//! of its instances report `RUNNING`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Desired-state updates and instance health polling

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

use crate::application::context::OperationContext;
use crate::application::operation::{Operation, Sequence};
use crate::application::poller::{JobPhase, Observation, Poller, Probe};
use crate::domain::config::PollSettings;
use crate::domain::manifest::Application;
use crate::domain::outcome::{AggregateOutcome, OperationError, Outcome};
use crate::domain::platform::InstanceInfo;

/// Upper bound on how long a start is awaited, in seconds.
const MAX_START_TIMEOUT_SECS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesiredState {
    Started,
    Stopped,
}

impl DesiredState {
    fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Started => "STARTED",
            DesiredState::Stopped => "STOPPED",
        }
    }
}

async fn set_state(ctx: &OperationContext, app_guid: &str, state: DesiredState) -> Outcome {
    let mut body = json!({ "state": state.as_str() });
    if state == DesiredState::Started {
        body["console"] = json!(true);
    }
    ctx.api()
        .put_json(
            &format!("/v2/apps/{}", app_guid),
            &[("inline-relations-depth", "1")],
            body,
        )
        .await
}

pub struct StopApplication<'a> {
    app: &'a Application,
}

impl<'a> StopApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for StopApplication<'a> {
    type Params = String;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Stop application {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<String, OperationError> {
        self.app.require_guid().map(str::to_string)
    }

    async fn execute(&self, ctx: &OperationContext, app_guid: String) -> Outcome {
        set_state(ctx, &app_guid, DesiredState::Stopped).await
    }
}

/// Success carries the refreshed application resource.
pub struct StartApplication<'a> {
    app: &'a Application,
}

impl<'a> StartApplication<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for StartApplication<'a> {
    type Params = String;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Start application {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<String, OperationError> {
        self.app.require_guid().map(str::to_string)
    }

    async fn execute(&self, ctx: &OperationContext, app_guid: String) -> Outcome {
        set_state(ctx, &app_guid, DesiredState::Started).await
    }
}

struct InstancesProbe {
    app_guid: String,
}

#[async_trait]
impl Probe for InstancesProbe {
    async fn probe(&mut self, ctx: &OperationContext) -> Result<Observation, OperationError> {
        let outcome = ctx
            .api()
            .get(&format!("/v2/apps/{}/instances", self.app_guid), &[])
            .await;
        // Staging apps answer 400 CF-NotStaged; only an expired token ends the wait.
        if let Some(err) = outcome.error() {
            if err.is_unauthorized() {
                return Err(err.clone());
            }
            debug!("Instances of {} not reported yet: {}", self.app_guid, err);
            return Ok(Observation::new(JobPhase::Running, None));
        }
        let instances: BTreeMap<String, InstanceInfo> = outcome.decode()?;

        let phase = if instances.values().any(|i| i.state == "FLAPPING") {
            JobPhase::Failed
        } else if !instances.is_empty() && instances.values().all(|i| i.state == "RUNNING") {
            JobPhase::Finished
        } else {
            JobPhase::Running
        };
        Ok(Observation::new(phase, outcome.payload().cloned()))
    }
}

pub struct AwaitParams {
    app_guid: String,
    attempts: u32,
}

/// Wait until every instance of the application is running.
///
/// The budget is `min(timeout, 180) / 2` polls, with `timeout` taken from
/// the manifest.
pub struct AwaitInstances<'a> {
    app: &'a Application,
}

impl<'a> AwaitInstances<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for AwaitInstances<'a> {
    type Params = AwaitParams;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Await instances of {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<AwaitParams, OperationError> {
        Ok(AwaitParams {
            app_guid: self.app.require_guid()?.to_string(),
            attempts: self.app.timeout_secs().min(MAX_START_TIMEOUT_SECS) / 2,
        })
    }

    async fn execute(&self, ctx: &OperationContext, params: AwaitParams) -> Outcome {
        let settings = PollSettings {
            interval: ctx.poll_settings().interval,
            max_attempts: params.attempts,
        };
        let mut probe = InstancesProbe {
            app_guid: params.app_guid,
        };

        let polled = Poller::new(ctx)
            .with_settings(settings)
            .run(Observation::new(JobPhase::Running, None), &mut probe)
            .await;

        match polled {
            Ok(state) if state.succeeded() => Outcome::success(200, state.last_payload),
            Ok(_) => OperationError::bad_request("An error occurred during application startup").into(),
            Err(e) => e.into(),
        }
    }
}

/// Stop then start the application.
pub struct Restart<'a> {
    app: &'a Application,
    await_instances: bool,
}

impl<'a> Restart<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self {
            app,
            await_instances: false,
        }
    }

    pub fn awaiting_instances(mut self) -> Self {
        self.await_instances = true;
        self
    }
}

#[async_trait]
impl<'a> Operation for Restart<'a> {
    type Params = ();
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Restart application {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        self.app.require_guid().map(|_| ())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> AggregateOutcome {
        let mut sequence = Sequence::new(self.name())
            .then(StopApplication::new(self.app))
            .then(StartApplication::new(self.app));
        if self.await_instances {
            sequence = sequence.then(AwaitInstances::new(self.app));
        }
        sequence.run(ctx).await
    }
}
