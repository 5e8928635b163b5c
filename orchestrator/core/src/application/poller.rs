// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Long-Running Job Poller
//!
//! Drives a server-tracked asynchronous job to a terminal state with a
//! fixed interval and a bounded number of attempts.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Explicit poll state machine with injectable sleep
//!
//! ```text
//! Running --(finished)--> Finished
//!    |    --(failed)----> Failed
//!    |    --(budget 0)--> TimedOut
//!    +--sleep, probe, attempts-1--+
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::application::context::OperationContext;
use crate::domain::config::PollSettings;
use crate::domain::outcome::{OperationError, Outcome};
use crate::domain::platform::{JobEntity, JobStatus, Resource};

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Running,
    Finished,
    Failed,
    TimedOut,
}

/// What a single status check reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub phase: JobPhase,
    pub payload: Option<Value>,
}

impl Observation {
    pub fn new(phase: JobPhase, payload: Option<Value>) -> Self {
        Self { phase, payload }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    pub phase: JobPhase,
    pub attempts_left: u32,
    pub last_payload: Option<Value>,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        self.phase != JobPhase::Running
    }

    pub fn succeeded(&self) -> bool {
        self.phase == JobPhase::Finished
    }
}

/// One status check of the tracked job.
#[async_trait]
pub trait Probe: Send {
    async fn probe(&mut self, ctx: &OperationContext) -> Result<Observation, OperationError>;
}

pub struct Poller<'a> {
    ctx: &'a OperationContext,
    settings: PollSettings,
}

impl<'a> Poller<'a> {
    pub fn new(ctx: &'a OperationContext) -> Self {
        Self {
            ctx,
            settings: ctx.poll_settings(),
        }
    }

    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Poll from `initial` until a terminal phase or the budget runs out.
    ///
    /// A failing status request aborts the loop with that failure.
    pub async fn run<P: Probe>(
        &self,
        initial: Observation,
        probe: &mut P,
    ) -> Result<PollState, OperationError> {
        let mut state = PollState {
            phase: initial.phase,
            attempts_left: self.settings.max_attempts,
            last_payload: initial.payload,
        };

        loop {
            if state.is_terminal() {
                return Ok(state);
            }
            if state.attempts_left == 0 {
                state.phase = JobPhase::TimedOut;
                return Ok(state);
            }

            self.ctx.sleeper().sleep(self.settings.interval).await;
            let observation = probe.probe(self.ctx).await?;
            state.attempts_left -= 1;
            state.phase = observation.phase;
            state.last_payload = observation.payload;
            debug!(
                "Poll observed {:?}, {} attempts left",
                state.phase, state.attempts_left
            );
        }
    }
}

/// Follows an asynchronous platform job through its `metadata.url`.
pub struct JobProbe {
    job_url: String,
}

impl JobProbe {
    pub fn new(job_url: impl Into<String>) -> Self {
        Self {
            job_url: job_url.into(),
        }
    }

    /// Read the job envelope returned by the submitting request.
    pub fn observe(outcome: &Outcome) -> Result<(Observation, Self), OperationError> {
        let job: Resource<JobEntity> = outcome.decode()?;
        let url = job
            .metadata
            .url
            .clone()
            .ok_or_else(|| OperationError::internal("Job response carried no status URL"))?;
        let observation = Observation::new(phase_of(job.entity.status), outcome.payload().cloned());
        Ok((observation, Self::new(url)))
    }
}

#[async_trait]
impl Probe for JobProbe {
    async fn probe(&mut self, ctx: &OperationContext) -> Result<Observation, OperationError> {
        let outcome = ctx.api().get(&self.job_url, &[]).await;
        let job: Resource<JobEntity> = outcome.decode()?;
        // The platform may move the job; always follow the latest link.
        if let Some(url) = &job.metadata.url {
            self.job_url = url.clone();
        }
        Ok(Observation::new(phase_of(job.entity.status), outcome.payload().cloned()))
    }
}

fn phase_of(status: JobStatus) -> JobPhase {
    match status {
        JobStatus::Finished => JobPhase::Finished,
        JobStatus::Failed => JobPhase::Failed,
        JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => JobPhase::Running,
    }
}
