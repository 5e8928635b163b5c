// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operation Model
//!
//! Every platform interaction is an [`Operation`]: a pure `validate`
//! that produces typed parameters, followed by an `execute` that consumes
//! them. Callers only ever use `run`, so execute never sees unvalidated
//! input.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Uniform validate-then-execute contract and sequencing
//!
//! # Composition
//!
//! [`Step`] is the object-safe face of an operation whose output folds into
//! an [`AggregateOutcome`]. [`Sequence`] runs a list of steps in order and
//! stops at the first failing one.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::context::OperationContext;
use crate::domain::outcome::{AggregateOutcome, OperationError, Report};

#[async_trait]
pub trait Operation: Send + Sync {
    type Params: Send;
    type Output: Report;

    /// Human readable description used in logs.
    fn name(&self) -> String;

    fn validate(&self, ctx: &OperationContext) -> Result<Self::Params, OperationError>;

    async fn execute(&self, ctx: &OperationContext, params: Self::Params) -> Self::Output;

    async fn run(&self, ctx: &OperationContext) -> Self::Output {
        let params = match self.validate(ctx) {
            Ok(params) => params,
            Err(e) => {
                warn!("{}: validation failed: {}", self.name(), e);
                return Self::Output::from(e);
            }
        };

        debug!("{}: executing", self.name());
        let output = self.execute(ctx, params).await;
        if !output.is_ok() {
            warn!("{}: failed", self.name());
        }
        output
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    fn step_name(&self) -> String;

    async fn run_step(&self, ctx: &OperationContext) -> AggregateOutcome;
}

#[async_trait]
impl<O> Step for O
where
    O: Operation,
{
    fn step_name(&self) -> String {
        self.name()
    }

    async fn run_step(&self, ctx: &OperationContext) -> AggregateOutcome {
        self.run(ctx).await.into()
    }
}

/// Runs child steps in order, short-circuiting on the first failure.
pub struct Sequence<'a> {
    name: String,
    steps: Vec<Box<dyn Step + 'a>>,
}

impl<'a> Sequence<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, step: impl Step + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl<'a> Operation for Sequence<'a> {
    type Params = ();
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute(&self, ctx: &OperationContext, _params: ()) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();
        for step in &self.steps {
            if !aggregate.absorb(step.run_step(ctx).await) {
                debug!("{}: stopping after failed step '{}'", self.name, step.step_name());
                break;
            }
        }
        aggregate
    }
}
