// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the cfpush CLI

pub mod app;
pub mod config;
pub mod target;

pub use self::app::{DeleteArgs, PushArgs, RestartArgs, TargetArgs};
pub use self::config::ConfigCommand;
