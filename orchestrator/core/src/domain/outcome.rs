// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operation Outcomes
//!
//! Status-bearing results produced by every platform operation, and the
//! ordered aggregate that composite operations accumulate.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tagged success/failure values with HTTP-style status codes

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Longest raw response body carried into an error message.
const MAX_RAW_MESSAGE: usize = 1000;

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Internal,
    Gateway,
    /// Any other non-success status reported by the platform.
    Rejected,
}

impl ErrorKind {
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
            ErrorKind::Gateway => 502,
            ErrorKind::Rejected => 400,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            502 | 503 | 504 => ErrorKind::Gateway,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Rejected,
        }
    }
}

/// The failure arm of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message} (HTTP {status})")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            message: message.into(),
            payload: None,
            cause: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn gateway(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Gateway, message).with_cause(cause)
    }

    /// Failure reported by the platform with an explicit status.
    pub fn from_status(status: u16, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            status,
            message: message.into(),
            payload,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Platform `error_code` carried in the failure payload, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("error_code"))
            .and_then(Value::as_str)
    }
}

/// Result of a single operation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        status: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Failure(OperationError),
}

impl Outcome {
    pub fn ok(payload: Value) -> Self {
        Outcome::Success {
            status: 200,
            payload: Some(payload),
        }
    }

    pub fn ok_empty() -> Self {
        Outcome::Success {
            status: 200,
            payload: None,
        }
    }

    pub fn success(status: u16, payload: Option<Value>) -> Self {
        Outcome::Success { status, payload }
    }

    /// Map a platform response onto an outcome.
    ///
    /// 204 and other 2xx codes succeed unless the body carries an
    /// `error_code`, which the platform uses to report failures inside
    /// otherwise successful responses.
    pub fn from_response(status: u16, body: Option<Value>) -> Self {
        if status == 204 {
            return Outcome::success(204, None);
        }

        if (200..300).contains(&status) {
            return match body {
                Some(payload) if payload.get("error_code").is_some() => {
                    let message = description(&payload)
                        .unwrap_or_else(|| "Platform reported an error".to_string());
                    Outcome::Failure(OperationError::internal(message).with_payload(payload))
                }
                payload => Outcome::success(status, payload),
            };
        }

        let message = body
            .as_ref()
            .and_then(description)
            .or_else(|| body.as_ref().and_then(raw_text))
            .unwrap_or_else(|| format!("Could not connect to host. Error: {}", status));

        Outcome::Failure(OperationError::from_status(status, message, body))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Outcome::Success { status, .. } => *status,
            Outcome::Failure(err) => err.status,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Outcome::Success { payload, .. } => payload.as_ref(),
            Outcome::Failure(err) => err.payload.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Decode the success payload into a typed platform document.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, OperationError> {
        match self {
            Outcome::Failure(err) => Err(err.clone()),
            Outcome::Success { payload: None, .. } => {
                Err(OperationError::internal("Platform response carried no payload"))
            }
            Outcome::Success {
                payload: Some(payload),
                ..
            } => serde_json::from_value(payload.clone()).map_err(|e| {
                OperationError::internal("Malformed platform response").with_cause(e.to_string())
            }),
        }
    }
}

impl From<OperationError> for Outcome {
    fn from(err: OperationError) -> Self {
        Outcome::Failure(err)
    }
}

fn description(body: &Value) -> Option<String> {
    body.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn raw_text(body: &Value) -> Option<String> {
    body.get("response")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(MAX_RAW_MESSAGE).collect())
}

/// Ordered collection of outcomes produced by a composite operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateOutcome {
    outcomes: Vec<Outcome>,
}

impl AggregateOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Append every outcome of `report` and return whether it succeeded.
    pub fn absorb(&mut self, report: impl Into<AggregateOutcome>) -> bool {
        let report = report.into();
        let ok = report.is_ok();
        self.outcomes.extend(report.outcomes);
        ok
    }

    /// True iff every member succeeded. An empty aggregate is ok.
    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_ok)
    }

    pub fn first_failure(&self) -> Option<&OperationError> {
        self.outcomes.iter().find_map(Outcome::error)
    }

    pub fn last(&self) -> Option<&Outcome> {
        self.outcomes.last()
    }

    pub fn first(&self) -> Option<&Outcome> {
        self.outcomes.first()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Status of the first failure, or of the last success.
    pub fn status(&self) -> u16 {
        match self.first_failure() {
            Some(err) => err.status,
            None => self.last().map(Outcome::status).unwrap_or(200),
        }
    }
}

impl From<Outcome> for AggregateOutcome {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcomes: vec![outcome],
        }
    }
}

impl From<OperationError> for AggregateOutcome {
    fn from(err: OperationError) -> Self {
        Outcome::Failure(err).into()
    }
}

/// Common surface of [`Outcome`] and [`AggregateOutcome`].
pub trait Report: From<OperationError> + Into<AggregateOutcome> + Send + 'static {
    fn is_ok(&self) -> bool;

    fn is_unauthorized(&self) -> bool;
}

impl Report for Outcome {
    fn is_ok(&self) -> bool {
        Outcome::is_ok(self)
    }

    fn is_unauthorized(&self) -> bool {
        self.error().is_some_and(OperationError::is_unauthorized)
    }
}

impl Report for AggregateOutcome {
    fn is_ok(&self) -> bool {
        AggregateOutcome::is_ok(self)
    }

    fn is_unauthorized(&self) -> bool {
        self.first_failure()
            .is_some_and(OperationError::is_unauthorized)
    }
}
