// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resolve and print the org/space a push would deploy into.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use cfpush_core::application::commands::ResolveTarget;
use cfpush_core::application::{Operation, OperationExt};
use cfpush_core::domain::config::ClientConfig;

use super::app::TargetArgs;
use crate::client;
use crate::output;

pub async fn handle_command(target: TargetArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = ClientConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let ctx = client::connect(&config).await?;

    let org = target.org.as_deref().or(config.organization.as_deref());
    let space = target.space.as_deref().or(config.space.as_deref());
    let resolved = ResolveTarget::new(org, space)
        .with_credential_retry()
        .run(&ctx)
        .await;
    output::report("Target resolution", &resolved, false)?;

    let summary = ctx.session().summary();
    println!();
    println!("  {} {}", "API:".bold(), summary.url);
    if let Some(org) = &summary.org {
        println!("  {} {} ({})", "Org:".bold(), org.name, org.guid.dimmed());
    }
    if let Some(space) = &summary.space {
        println!("  {} {} ({})", "Space:".bold(), space.name, space.guid.dimmed());
    }
    Ok(())
}
