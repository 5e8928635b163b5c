// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! cfpush core
//!
//! Client-side orchestration of application deployments against a Cloud
//! Foundry v2 API: composable operations, credential retry, compensating
//! rollback, job polling and the push workflow.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Library entry point re-exporting the layers

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
