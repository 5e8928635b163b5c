// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Organization and space targeting.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::info;

use super::payload;
use crate::application::context::OperationContext;
use crate::application::operation::{Operation, Sequence};
use crate::domain::outcome::{AggregateOutcome, OperationError, Outcome};
use crate::domain::platform::{OrganizationEntity, Resource, SpaceEntity};
use crate::domain::session::{OrgRef, SpaceRef};

/// Pick the resource called `name`, or the first one when no name is given.
fn pick<T>(
    resources: Vec<Resource<T>>,
    name: Option<&str>,
    entity_name: impl Fn(&T) -> &str,
) -> Option<Resource<T>> {
    match name {
        Some(name) => resources.into_iter().find(|r| entity_name(&r.entity) == name),
        None => resources.into_iter().next(),
    }
}

async fn list<T: DeserializeOwned>(ctx: &OperationContext, path: &str) -> Result<Vec<Resource<T>>, OperationError> {
    ctx.api().list_all::<T>(path, &[("inline-relations-depth", "1")]).await
}

/// Target an organization by name, or the first one visible.
pub struct SetOrg<'a> {
    name: Option<&'a str>,
}

impl<'a> SetOrg<'a> {
    pub fn new(name: Option<&'a str>) -> Self {
        Self { name }
    }
}

#[async_trait]
impl<'a> Operation for SetOrg<'a> {
    type Params = ();
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Set organization {}", self.name.unwrap_or("(default)"))
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> Outcome {
        let orgs = match list::<OrganizationEntity>(ctx, "/v2/organizations").await {
            Ok(orgs) => orgs,
            Err(e) => return e.into(),
        };

        let Some(org) = pick(orgs, self.name, |o| o.name.as_str()) else {
            return OperationError::not_found("Organization not found").into();
        };

        info!("Targeting organization {}", org.entity.name);
        ctx.session().set_org(OrgRef {
            guid: org.metadata.guid.clone(),
            name: org.entity.name.clone(),
        });
        payload(&org)
    }
}

/// Target a space of the current organization.
pub struct SetSpace<'a> {
    name: Option<&'a str>,
}

impl<'a> SetSpace<'a> {
    pub fn new(name: Option<&'a str>) -> Self {
        Self { name }
    }
}

#[async_trait]
impl<'a> Operation for SetSpace<'a> {
    type Params = OrgRef;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Set space {}", self.name.unwrap_or("(default)"))
    }

    fn validate(&self, ctx: &OperationContext) -> Result<OrgRef, OperationError> {
        ctx.session().require_org()
    }

    async fn execute(&self, ctx: &OperationContext, org: OrgRef) -> Outcome {
        let path = format!("/v2/organizations/{}/spaces", org.guid);
        let spaces = match list::<SpaceEntity>(ctx, &path).await {
            Ok(spaces) => spaces,
            Err(e) => return e.into(),
        };

        let Some(space) = pick(spaces, self.name, |s| s.name.as_str()) else {
            return OperationError::not_found("Space not found").into();
        };

        info!("Targeting space {}", space.entity.name);
        ctx.session().set_space(SpaceRef {
            guid: space.metadata.guid.clone(),
            name: space.entity.name.clone(),
        });
        payload(&space)
    }
}

/// Target organization then space.
pub struct ResolveTarget<'a> {
    org: Option<&'a str>,
    space: Option<&'a str>,
}

impl<'a> ResolveTarget<'a> {
    pub fn new(org: Option<&'a str>, space: Option<&'a str>) -> Self {
        Self { org, space }
    }
}

#[async_trait]
impl<'a> Operation for ResolveTarget<'a> {
    type Params = ();
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        "Resolve target".to_string()
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> AggregateOutcome {
        Sequence::new(self.name())
            .then(SetOrg::new(self.org))
            .then(SetSpace::new(self.space))
            .run(ctx)
            .await
    }
}
