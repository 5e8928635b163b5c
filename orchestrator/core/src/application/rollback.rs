// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Compensating Rollback
//!
//! Undo partially created platform resources when a multi-step creation
//! fails midway.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Best-effort compensation that preserves the original failure

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::context::OperationContext;
use crate::application::operation::{Operation, Step};
use crate::domain::outcome::{AggregateOutcome, OperationError};

/// An aggregate-producing operation that knows how to undo itself.
pub trait Compensable: Operation<Output = AggregateOutcome> {
    /// Whether `outcome` shows that some resource was created.
    fn created_resources(&self, outcome: &AggregateOutcome) -> bool;

    /// Steps that undo the creation, in execution order.
    fn compensations(&self) -> Vec<Box<dyn Step + '_>>;
}

/// Runs the compensations of a failed [`Compensable`] operation.
///
/// Compensation results are logged and discarded; the caller always gets
/// the original aggregate.
pub struct CompensatingRollback<O> {
    inner: O,
}

impl<O: Compensable> CompensatingRollback<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: Compensable> Operation for CompensatingRollback<O> {
    type Params = ();
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        self.inner.name()
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> AggregateOutcome {
        let outcome = self.inner.run(ctx).await;
        if outcome.is_ok() || !self.inner.created_resources(&outcome) {
            return outcome;
        }

        info!("{}: rolling back partially created resources", self.inner.name());
        for step in self.inner.compensations() {
            let compensation = step.run_step(ctx).await;
            if !compensation.is_ok() {
                warn!(
                    "Compensation '{}' failed and was ignored: {:?}",
                    step.step_name(),
                    compensation.first_failure().map(|e| e.message.as_str())
                );
            }
        }
        outcome
    }
}
