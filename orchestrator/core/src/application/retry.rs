// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credential retry
//!
//! Re-runs an operation once after refreshing an expired access token.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::context::OperationContext;
use crate::application::operation::Operation;
use crate::domain::outcome::{OperationError, Report};

/// Runs the wrapped operation; on a 401 with a refreshable credential,
/// refreshes it and runs the operation exactly once more.
///
/// The second result is returned as is. When no refresh is possible the
/// original failure is returned.
pub struct CredentialRetry<O> {
    inner: O,
}

impl<O: Operation> CredentialRetry<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: Operation> Operation for CredentialRetry<O> {
    type Params = ();
    type Output = O::Output;

    fn name(&self) -> String {
        self.inner.name()
    }

    // The wrapped operation validates itself on every attempt.
    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> O::Output {
        let observed = ctx.session().credential().map(|c| c.version);
        let first = self.inner.run(ctx).await;
        if !first.is_unauthorized() {
            return first;
        }

        let (Some(version), Some(service)) = (observed, ctx.token_service()) else {
            return first;
        };

        match ctx.session().refresh_credential(version, service).await {
            Ok(_) => {
                info!("{}: retrying with refreshed credential", self.inner.name());
                self.inner.run(ctx).await
            }
            Err(e) => {
                warn!("{}: credential refresh failed: {}", self.inner.name(), e);
                first
            }
        }
    }
}

/// Wrapping helpers available on every operation.
pub trait OperationExt: Operation + Sized {
    fn with_credential_retry(self) -> CredentialRetry<Self> {
        CredentialRetry::new(self)
    }
}

impl<O: Operation> OperationExt for O {}
