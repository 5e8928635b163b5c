// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain listing and selection.

use async_trait::async_trait;

use super::payload;
use crate::application::context::OperationContext;
use crate::application::operation::Operation;
use crate::domain::outcome::{OperationError, Outcome};
use crate::domain::platform::{DomainEntity, Resource};

/// List the domains visible to the user.
///
/// Success carries the domain resources as a JSON array.
pub struct GetDomains;

#[async_trait]
impl Operation for GetDomains {
    type Params = ();
    type Output = Outcome;

    fn name(&self) -> String {
        "Get domains".to_string()
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> Outcome {
        match ctx
            .api()
            .list_all::<DomainEntity>("/v2/domains", &[("inline-relations-depth", "1")])
            .await
        {
            Ok(domains) => payload(&domains),
            Err(e) => e.into(),
        }
    }
}

/// Pick the requested domain, or the first one when none was requested.
pub fn select_domain(
    domains: Vec<Resource<DomainEntity>>,
    requested: Option<&str>,
) -> Result<Resource<DomainEntity>, OperationError> {
    if domains.is_empty() {
        return Err(OperationError::bad_request(
            "Failed to find available domains in target",
        ));
    }

    match requested {
        Some(name) => domains
            .into_iter()
            .find(|d| d.entity.name == name)
            .ok_or_else(|| {
                OperationError::bad_request(format!("Failed to find domain {} in target", name))
            }),
        None => domains
            .into_iter()
            .next()
            .ok_or_else(|| OperationError::bad_request("Failed to find available domains in target")),
    }
}
