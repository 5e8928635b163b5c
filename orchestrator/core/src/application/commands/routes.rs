// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Route Commands
//!
//! Find, create and attach routes, and the composite that gives a freshly
//! created application its route.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Route resolution from manifest host/domain declarations
//!
//! A route is `host.domain`. The host is the manifest `host` or the
//! slugified application name; the domain is the manifest `domain` or the
//! first domain the target offers.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::domains::{select_domain, GetDomains};
use super::payload;
use crate::application::context::OperationContext;
use crate::application::operation::Operation;
use crate::domain::manifest::Application;
use crate::domain::outcome::{AggregateOutcome, ErrorKind, OperationError, Outcome};
use crate::domain::platform::{DomainEntity, Page, Resource, RouteBinding, RouteEntity};
use crate::domain::session::SpaceRef;

fn route_query(host: &str, domain_guid: &str) -> String {
    format!("host:{};domain_guid:{}", host, domain_guid)
}

/// Resolve the domain a route should live on, recording the listing.
async fn resolve_domain(
    ctx: &OperationContext,
    requested: Option<&str>,
    aggregate: &mut AggregateOutcome,
) -> Option<Resource<DomainEntity>> {
    let listing = GetDomains.run(ctx).await;
    let domains = listing.decode::<Vec<Resource<DomainEntity>>>();
    if !aggregate.absorb(listing) {
        return None;
    }

    match domains.and_then(|domains| select_domain(domains, requested)) {
        Ok(domain) => Some(domain),
        Err(e) => {
            aggregate.push(e.into());
            None
        }
    }
}

/// Look up the route for `host` on a domain. Missing routes are NotFound.
pub struct FindRoute<'a> {
    host: &'a str,
    domain_guid: &'a str,
}

impl<'a> FindRoute<'a> {
    pub fn new(host: &'a str, domain_guid: &'a str) -> Self {
        Self { host, domain_guid }
    }
}

#[async_trait]
impl<'a> Operation for FindRoute<'a> {
    type Params = ();
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Find route {}", self.host)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> Outcome {
        let query = route_query(self.host, self.domain_guid);
        let outcome = ctx
            .api()
            .get(
                "/v2/routes",
                &[("inline-relations-depth", "1"), ("q", query.as_str())],
            )
            .await;

        match outcome.decode::<Page<RouteEntity>>() {
            Ok(page) => match page.resources.into_iter().next() {
                Some(route) => payload(&route),
                None => OperationError::not_found("Route not found").into(),
            },
            Err(e) => e.into(),
        }
    }
}

pub struct CreateRoute<'a> {
    host: &'a str,
    domain_guid: &'a str,
}

impl<'a> CreateRoute<'a> {
    pub fn new(host: &'a str, domain_guid: &'a str) -> Self {
        Self { host, domain_guid }
    }
}

#[async_trait]
impl<'a> Operation for CreateRoute<'a> {
    type Params = SpaceRef;
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Create route {}", self.host)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<SpaceRef, OperationError> {
        if self.host.is_empty() {
            return Err(OperationError::bad_request("Route host is required"));
        }
        ctx.session().require_space()
    }

    async fn execute(&self, ctx: &OperationContext, space: SpaceRef) -> Outcome {
        let body = json!({
            "space_guid": space.guid,
            "host": self.host,
            "domain_guid": self.domain_guid,
        });
        ctx.api().post_json("/v2/routes", &[], body).await
    }
}

pub struct AttachRoute<'a> {
    app_guid: &'a str,
    route_guid: &'a str,
}

impl<'a> AttachRoute<'a> {
    pub fn new(app_guid: &'a str, route_guid: &'a str) -> Self {
        Self { app_guid, route_guid }
    }
}

#[async_trait]
impl<'a> Operation for AttachRoute<'a> {
    type Params = ();
    type Output = Outcome;

    fn name(&self) -> String {
        format!("Attach route {} to {}", self.route_guid, self.app_guid)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> Outcome {
        let path = format!("/v2/apps/{}/routes/{}", self.app_guid, self.route_guid);
        ctx.api().put_empty(&path, &[]).await
    }
}

pub struct RoutePlan {
    app_guid: String,
    host: String,
    domain: Option<String>,
}

/// Give an application its route, reusing an existing one when possible.
///
/// On success the aggregate ends with a [`RouteBinding`] payload.
pub struct BindRoute<'a> {
    app: &'a Application,
}

impl<'a> BindRoute<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for BindRoute<'a> {
    type Params = Option<RoutePlan>;
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Bind route for {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<Option<RoutePlan>, OperationError> {
        if self.app.manifest.no_route {
            return Ok(None);
        }
        ctx.session().require_space()?;
        let app_guid = self.app.require_guid()?.to_string();
        let host = self.app.host();
        if host.is_empty() {
            return Err(OperationError::bad_request(format!(
                "Cannot derive a route host from application name {}",
                self.app.name
            )));
        }

        Ok(Some(RoutePlan {
            app_guid,
            host,
            domain: self.app.manifest.domain.clone(),
        }))
    }

    async fn execute(&self, ctx: &OperationContext, plan: Option<RoutePlan>) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();
        let Some(plan) = plan else {
            aggregate.push(payload(&RouteBinding::default()));
            return aggregate;
        };

        let Some(domain) = resolve_domain(ctx, plan.domain.as_deref(), &mut aggregate).await else {
            return aggregate;
        };

        let existing = FindRoute::new(&plan.host, domain.guid()).run(ctx).await;
        let route = match existing.decode::<Resource<RouteEntity>>() {
            Ok(route) => {
                let attached = AttachRoute::new(&plan.app_guid, route.guid()).run(ctx).await;
                if attached.error().is_some_and(OperationError::is_unauthorized) {
                    aggregate.push(attached);
                    return aggregate;
                }
                if !attached.is_ok() {
                    aggregate.push(
                        OperationError::conflict(format!(
                            "The host {} is already used in another space.",
                            plan.host
                        ))
                        .into(),
                    );
                    return aggregate;
                }
                aggregate.push(attached);
                route
            }
            Err(e) if e.kind == ErrorKind::NotFound => {
                let created = CreateRoute::new(&plan.host, domain.guid()).run(ctx).await;
                let route = created.decode::<Resource<RouteEntity>>();
                if !aggregate.absorb(created) {
                    return aggregate;
                }
                let route = match route {
                    Ok(route) => route,
                    Err(e) => {
                        aggregate.push(e.into());
                        return aggregate;
                    }
                };

                let attached = AttachRoute::new(&plan.app_guid, route.guid()).run(ctx).await;
                if !aggregate.absorb(attached) {
                    return aggregate;
                }
                route
            }
            Err(e) => {
                aggregate.push(e.into());
                return aggregate;
            }
        };

        info!(
            "Bound route {}.{} to {}",
            plan.host, domain.entity.name, self.app.name
        );
        aggregate.push(payload(&RouteBinding {
            domain: Some(domain.entity.name),
            route: Some(route),
        }));
        aggregate
    }
}

pub struct RouteSelector {
    space_guid: String,
    host: String,
    domain: Option<String>,
}

/// Delete the application's routes (host on domain) in the targeted space.
pub struct DeleteApplicationRoutes<'a> {
    app: &'a Application,
}

impl<'a> DeleteApplicationRoutes<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for DeleteApplicationRoutes<'a> {
    type Params = Option<RouteSelector>;
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Delete routes of {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<Option<RouteSelector>, OperationError> {
        let host = self.app.host();
        if self.app.manifest.no_route || host.is_empty() {
            return Ok(None);
        }
        Ok(Some(RouteSelector {
            space_guid: ctx.session().require_space()?.guid,
            host,
            domain: self.app.manifest.domain.clone(),
        }))
    }

    async fn execute(
        &self,
        ctx: &OperationContext,
        selector: Option<RouteSelector>,
    ) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();
        let Some(selector) = selector else {
            return aggregate;
        };

        let Some(domain) = resolve_domain(ctx, selector.domain.as_deref(), &mut aggregate).await
        else {
            return aggregate;
        };

        let query = route_query(&selector.host, domain.guid());
        let routes = match ctx
            .api()
            .list_all::<RouteEntity>(
                "/v2/routes",
                &[("inline-relations-depth", "1"), ("q", query.as_str())],
            )
            .await
        {
            Ok(routes) => routes,
            Err(e) => {
                aggregate.push(e.into());
                return aggregate;
            }
        };

        for route in routes.iter().filter(|r| {
            r.entity.host == selector.host
                && r.entity.domain_guid == domain.guid()
                && r.entity.space_guid.as_deref() == Some(selector.space_guid.as_str())
        }) {
            let deleted = ctx
                .api()
                .delete(
                    &format!("/v2/routes/{}", route.guid()),
                    &[("recursive", "true")],
                )
                .await;
            if !aggregate.absorb(deleted) {
                return aggregate;
            }
            info!("Deleted route {}.{}", selector.host, domain.entity.name);
        }
        aggregate
    }
}
