// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types and collaborator seams shared by every operation.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Outcomes, session state, manifests, platform documents

pub mod archive;
pub mod auth;
pub mod config;
pub mod manifest;
pub mod outcome;
pub mod platform;
pub mod session;
pub mod transport;
