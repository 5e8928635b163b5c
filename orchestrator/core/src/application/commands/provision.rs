// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Create-and-route composite with its compensations.

use async_trait::async_trait;

use super::apps::{CreateApplication, DeleteApplication};
use super::routes::{BindRoute, DeleteApplicationRoutes};
use crate::application::context::OperationContext;
use crate::application::operation::{Operation, Step};
use crate::application::retry::OperationExt;
use crate::application::rollback::Compensable;
use crate::domain::manifest::Application;
use crate::domain::outcome::{AggregateOutcome, OperationError};
use crate::domain::platform::{AppEntity, Resource};

/// Create the application, then bind its route.
///
/// The first outcome of the aggregate is always the creation request, so
/// a successful first outcome means the application exists. Each request
/// refreshes an expired credential on its own, so a 401 in the route stage
/// never re-creates the application.
pub struct CreateApplicationWithRoute<'a> {
    app: &'a Application,
}

impl<'a> CreateApplicationWithRoute<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for CreateApplicationWithRoute<'a> {
    type Params = ();
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Create application {} with route", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();

        let created = CreateApplication::new(self.app)
            .with_credential_retry()
            .run(ctx)
            .await;
        let resource = created.decode::<Resource<AppEntity>>();
        if !aggregate.absorb(created) {
            return aggregate;
        }
        let guid = match resource {
            Ok(resource) => resource.metadata.guid,
            Err(e) => {
                aggregate.push(e.into());
                return aggregate;
            }
        };

        let deployed = self.app.clone().with_guid(guid);
        aggregate.absorb(
            BindRoute::new(&deployed)
                .with_credential_retry()
                .run(ctx)
                .await,
        );
        aggregate
    }
}

impl<'a> Compensable for CreateApplicationWithRoute<'a> {
    fn created_resources(&self, outcome: &AggregateOutcome) -> bool {
        outcome.first().is_some_and(|first| first.is_ok())
    }

    /// Routes first, then the application itself.
    fn compensations(&self) -> Vec<Box<dyn Step + '_>> {
        vec![
            Box::new(DeleteApplicationRoutes::new(self.app).with_credential_retry()),
            Box::new(DeleteApplication::new(self.app).with_credential_retry()),
        ]
    }
}
