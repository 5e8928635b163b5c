// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Binding
//!
//! Binds manifest-declared service instances to the application. Instances
//! are looked up by name in the space first; in the map form a missing
//! instance is created from the catalog plan.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Catalog plan resolution, instance creation, binding

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::application::context::{OperationContext, PlatformApi};
use crate::application::operation::Operation;
use crate::domain::manifest::{Application, ServiceDeclarations};
use crate::domain::outcome::{AggregateOutcome, OperationError, Outcome};
use crate::domain::platform::{Page, Resource, ServiceEntity, ServiceInstanceEntity};
use crate::domain::session::SpaceRef;

/// Platform error code for a binding that already exists.
const BINDING_TAKEN: &str = "CF-ServiceBindingAppServiceTaken";

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub instance: String,
    pub label: String,
    pub provider: String,
    pub plan: String,
}

#[derive(Debug, Clone)]
pub enum ServicePlan {
    Nothing,
    Provision(Vec<ProvisionRequest>),
    BindExisting(Vec<String>),
}

pub struct BindingParams {
    space: SpaceRef,
    app_guid: String,
    plan: ServicePlan,
}

pub struct BindServices<'a> {
    app: &'a Application,
}

impl<'a> BindServices<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for BindServices<'a> {
    type Params = BindingParams;
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Bind services of {}", self.app.name)
    }

    fn validate(&self, ctx: &OperationContext) -> Result<BindingParams, OperationError> {
        let plan = match &self.app.manifest.services {
            None => ServicePlan::Nothing,
            Some(declared) if declared.is_empty() => ServicePlan::Nothing,
            Some(ServiceDeclarations::Existing(names)) => ServicePlan::BindExisting(names.clone()),
            Some(ServiceDeclarations::Provisioned(specs)) => {
                ServicePlan::Provision(provision_requests(specs)?)
            }
        };

        Ok(BindingParams {
            space: ctx.session().require_space()?,
            app_guid: self.app.require_guid()?.to_string(),
            plan,
        })
    }

    async fn execute(&self, ctx: &OperationContext, params: BindingParams) -> AggregateOutcome {
        match &params.plan {
            ServicePlan::Nothing => AggregateOutcome::new(),
            ServicePlan::Provision(requests) => provision(ctx, &params, requests).await,
            ServicePlan::BindExisting(names) => bind_existing(ctx, &params, names).await,
        }
    }
}

fn provision_requests(
    specs: &BTreeMap<String, crate::domain::manifest::ServiceSpec>,
) -> Result<Vec<ProvisionRequest>, OperationError> {
    specs
        .iter()
        .map(|(instance, spec)| {
            let label = spec.offering().ok_or_else(|| {
                OperationError::bad_request(format!(
                    "Service {} must declare a type or label",
                    instance
                ))
            })?;
            Ok(ProvisionRequest {
                instance: instance.clone(),
                label: label.to_string(),
                provider: spec.provider.clone(),
                plan: spec.plan.clone(),
            })
        })
        .collect()
}

/// Find the plan GUID by exact label+provider, then exact plan name.
pub fn find_plan_guid(
    catalog: &[Resource<ServiceEntity>],
    label: &str,
    provider: &str,
    plan: &str,
) -> Option<String> {
    catalog
        .iter()
        .filter(|s| s.entity.label == label && s.entity.provider.as_deref() == Some(provider))
        .flat_map(|s| s.entity.service_plans.iter())
        .find(|p| p.entity.name == plan)
        .map(|p| p.metadata.guid.clone())
}

async fn provision(
    ctx: &OperationContext,
    params: &BindingParams,
    requests: &[ProvisionRequest],
) -> AggregateOutcome {
    let api = ctx.api();
    let mut aggregate = AggregateOutcome::new();

    let catalog = match api
        .list_all::<ServiceEntity>("/v2/services", &[("inline-relations-depth", "1")])
        .await
    {
        Ok(catalog) => catalog,
        Err(e) => {
            aggregate.push(e.into());
            return aggregate;
        }
    };
    debug!("Service catalog lists {} offerings", catalog.len());

    for request in requests {
        let existing = match find_instance(&api, &params.space, &request.instance).await {
            Ok(existing) => existing,
            Err(e) => {
                aggregate.push(e.into());
                return aggregate;
            }
        };

        let instance_guid = match existing {
            Some(instance) => {
                debug!("Reusing service instance {}", request.instance);
                instance.metadata.guid
            }
            None => match create_instance(&api, params, &catalog, request, &mut aggregate).await {
                Some(guid) => guid,
                None => return aggregate,
            },
        };

        let bound = bind(&api, &params.app_guid, &instance_guid).await;
        if !aggregate.absorb(bound) {
            return aggregate;
        }
        info!("Bound service instance {}", request.instance);
    }
    aggregate
}

/// Create the instance from the catalog plan. `None` means the aggregate
/// now ends in a failure.
async fn create_instance(
    api: &PlatformApi<'_>,
    params: &BindingParams,
    catalog: &[Resource<ServiceEntity>],
    request: &ProvisionRequest,
    aggregate: &mut AggregateOutcome,
) -> Option<String> {
    let Some(plan_guid) = find_plan_guid(catalog, &request.label, &request.provider, &request.plan)
    else {
        aggregate.push(
            OperationError::bad_request(format!(
                "Could not find service instance {} nor service {} with plan {} in target.",
                request.instance, request.label, request.plan
            ))
            .into(),
        );
        return None;
    };

    let created = api
        .post_json(
            "/v2/service_instances",
            &[],
            json!({
                "space_guid": params.space.guid,
                "name": request.instance,
                "service_plan_guid": plan_guid,
            }),
        )
        .await;
    let instance = created.decode::<Resource<ServiceInstanceEntity>>();
    if !aggregate.absorb(created) {
        return None;
    }
    match instance {
        Ok(instance) => {
            info!("Created service instance {}", request.instance);
            Some(instance.metadata.guid)
        }
        Err(e) => {
            aggregate.push(e.into());
            None
        }
    }
}

/// Look up a service instance of the space by name, user-provided included.
async fn find_instance(
    api: &PlatformApi<'_>,
    space: &SpaceRef,
    name: &str,
) -> Result<Option<Resource<ServiceInstanceEntity>>, OperationError> {
    let query = format!("name:{}", name);
    let page: Page<ServiceInstanceEntity> = api
        .get(
            &format!("/v2/spaces/{}/service_instances", space.guid),
            &[
                ("return_user_provided_service_instances", "true"),
                ("q", query.as_str()),
                ("inline-relations-depth", "1"),
            ],
        )
        .await
        .decode()?;
    Ok(page.resources.into_iter().next())
}

async fn bind_existing(
    ctx: &OperationContext,
    params: &BindingParams,
    names: &[String],
) -> AggregateOutcome {
    let api = ctx.api();
    let mut aggregate = AggregateOutcome::new();

    for name in names {
        let found = match find_instance(&api, &params.space, name).await {
            Ok(found) => found,
            Err(e) => {
                aggregate.push(e.into());
                return aggregate;
            }
        };
        let Some(instance) = found else {
            aggregate.push(
                OperationError::bad_request(format!(
                    "Service instance {} can not be found in target space",
                    name
                ))
                .into(),
            );
            return aggregate;
        };

        let bound = bind(&api, &params.app_guid, instance.guid()).await;
        if bound
            .error()
            .is_some_and(|e| e.error_code() == Some(BINDING_TAKEN))
        {
            debug!("Service instance {} is already bound", name);
            continue;
        }
        if !aggregate.absorb(bound) {
            return aggregate;
        }
        info!("Bound service instance {}", name);
    }
    aggregate
}

async fn bind(api: &PlatformApi<'_>, app_guid: &str, instance_guid: &str) -> Outcome {
    api.post_json(
        "/v2/service_bindings",
        &[],
        json!({
            "app_guid": app_guid,
            "service_instance_guid": instance_guid,
        }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::platform::{Metadata, ServicePlanEntity};

    fn service(label: &str, provider: Option<&str>, plans: &[(&str, &str)]) -> Resource<ServiceEntity> {
        Resource {
            metadata: Metadata { guid: format!("svc-{}", label), url: None },
            entity: ServiceEntity {
                label: label.into(),
                provider: provider.map(str::to_string),
                service_plans: plans
                    .iter()
                    .map(|(guid, name)| Resource {
                        metadata: Metadata { guid: guid.to_string(), url: None },
                        entity: ServicePlanEntity { name: name.to_string() },
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_plan_lookup_requires_exact_matches() {
        let catalog = vec![
            service("postgres", Some("core"), &[("p-small", "small"), ("p-large", "large")]),
            service("postgres", Some("other"), &[("o-small", "small")]),
            service("redis", None, &[("r-small", "small")]),
        ];

        assert_eq!(
            find_plan_guid(&catalog, "postgres", "core", "large").as_deref(),
            Some("p-large")
        );
        assert_eq!(
            find_plan_guid(&catalog, "postgres", "other", "small").as_deref(),
            Some("o-small")
        );
        assert!(find_plan_guid(&catalog, "postgres", "core", "Small").is_none());
        assert!(find_plan_guid(&catalog, "redis", "core", "small").is_none());
        assert!(find_plan_guid(&catalog, "mysql", "core", "small").is_none());
    }
}
