// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Platform Commands
//!
//! Concrete operations against the v2 API, one module per resource family.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Validate manifest-derived input, issue requests, fold outcomes

pub mod apps;
pub mod domains;
pub mod lifecycle;
pub mod provision;
pub mod push;
pub mod routes;
pub mod services;
pub mod target;
pub mod upload;

use serde::Serialize;

use crate::domain::outcome::{OperationError, Outcome};

/// Successful outcome carrying `value` as its payload.
pub(crate) fn payload<T: Serialize>(value: &T) -> Outcome {
    match serde_json::to_value(value) {
        Ok(value) => Outcome::ok(value),
        Err(e) => OperationError::internal("Failed to encode payload")
            .with_cause(e.to_string())
            .into(),
    }
}

pub use apps::{CreateApplication, DeleteApplication, GetApplication, UpdateApplication};
pub use domains::GetDomains;
pub use lifecycle::{AwaitInstances, Restart, StartApplication, StopApplication};
pub use provision::CreateApplicationWithRoute;
pub use push::PushApplication;
pub use routes::{AttachRoute, BindRoute, CreateRoute, DeleteApplicationRoutes, FindRoute};
pub use services::BindServices;
pub use target::{ResolveTarget, SetOrg, SetSpace};
pub use upload::UploadBits;
