// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application commands
//!
//! Commands: push, restart, delete
//!
//! Each command loads the configuration, resolves the target org/space,
//! reads the manifest and looks the application up before running its
//! operation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use cfpush_core::application::commands::{
    DeleteApplication, DeleteApplicationRoutes, GetApplication, PushApplication, ResolveTarget,
    Restart,
};
use cfpush_core::application::{Operation, OperationContext, OperationExt, Sequence};
use cfpush_core::domain::config::ClientConfig;
use cfpush_core::domain::manifest::{Application, Manifest};
use cfpush_core::domain::outcome::ErrorKind;
use cfpush_core::domain::platform::{AppEntity, Resource};

use crate::client;
use crate::output;

/// Target overrides shared by the application commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Organization name (default: configured, else the first one)
    #[arg(long, env = "CFPUSH_ORG")]
    pub org: Option<String>,

    /// Space name (default: configured, else the first one)
    #[arg(long, env = "CFPUSH_SPACE")]
    pub space: Option<String>,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to the application manifest (YAML or JSON)
    #[arg(short, long, value_name = "FILE", default_value = "manifest.yml")]
    pub manifest: PathBuf,

    /// Content root to upload (default: manifest `path`, else the manifest directory)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Print the payload of every step
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct RestartArgs {
    #[arg(short, long, value_name = "FILE", default_value = "manifest.yml")]
    pub manifest: PathBuf,

    /// Wait until every instance reports RUNNING
    #[arg(short, long)]
    pub wait: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(short, long, value_name = "FILE", default_value = "manifest.yml")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub async fn push(args: PushArgs, config_path: Option<PathBuf>) -> Result<()> {
    let (ctx, app) = prepare(&args.manifest, args.path, &args.target, config_path).await?;

    println!(
        "Pushing {} to {}",
        app.name.bold(),
        ctx.session().endpoint().as_str().cyan()
    );
    let aggregate = PushApplication::new(&app).run(&ctx).await;

    output::report("Push", &aggregate, args.verbose)?;
    output::print_summary(&aggregate);
    Ok(())
}

pub async fn restart(args: RestartArgs, config_path: Option<PathBuf>) -> Result<()> {
    let (ctx, app) = prepare(&args.manifest, None, &args.target, config_path).await?;
    if app.guid.is_none() {
        anyhow::bail!("Application {} does not exist in the targeted space", app.name);
    }

    println!("Restarting {}", app.name.bold());
    let mut restart = Restart::new(&app);
    if args.wait {
        restart = restart.awaiting_instances();
    }
    let aggregate = restart.with_credential_retry().run(&ctx).await;

    output::report("Restart", &aggregate, false)
}

pub async fn delete(args: DeleteArgs, config_path: Option<PathBuf>) -> Result<()> {
    let (ctx, app) = prepare(&args.manifest, None, &args.target, config_path).await?;
    if app.guid.is_none() {
        println!("{}", format!("Application {} does not exist", app.name).yellow());
        return Ok(());
    }

    println!("Deleting {}", app.name.bold());
    let aggregate = Sequence::new(format!("Delete {}", app.name))
        .then(DeleteApplicationRoutes::new(&app).with_credential_retry())
        .then(DeleteApplication::new(&app).with_credential_retry())
        .run(&ctx)
        .await;

    output::report("Delete", &aggregate, false)
}

/// Connect, resolve the target and load the application with its guid
/// when it already exists.
async fn prepare(
    manifest_path: &Path,
    path_override: Option<PathBuf>,
    target: &TargetArgs,
    config_path: Option<PathBuf>,
) -> Result<(OperationContext, Application)> {
    let config = ClientConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let ctx = client::connect(&config).await?;

    let org = target.org.as_deref().or(config.organization.as_deref());
    let space = target.space.as_deref().or(config.space.as_deref());
    let resolved = ResolveTarget::new(org, space)
        .with_credential_retry()
        .run(&ctx)
        .await;
    if !resolved.is_ok() {
        output::report("Target resolution", &resolved, false)?;
    }
    let summary = ctx.session().summary();
    info!(
        "Targeting org {} space {}",
        summary.org.as_ref().map(|o| o.name.as_str()).unwrap_or("-"),
        summary.space.as_ref().map(|s| s.name.as_str()).unwrap_or("-"),
    );

    let manifest = Manifest::from_file(manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let declared_path = manifest
        .applications
        .first()
        .and_then(|a| a.path.as_deref())
        .map(PathBuf::from);
    let root = content_root(manifest_path, declared_path, path_override);
    let app = Application::from_manifest(&manifest, Some(root))?;

    let lookup = GetApplication::new(&app.name)
        .with_credential_retry()
        .run(&ctx)
        .await;
    let app = match lookup.decode::<Resource<AppEntity>>() {
        Ok(existing) => {
            info!("Application {} exists as {}", app.name, existing.guid());
            app.with_guid(existing.metadata.guid)
        }
        Err(e) if e.kind == ErrorKind::NotFound => app,
        Err(e) => return Err(e).context("Failed to look up the application"),
    };

    Ok((ctx, app))
}

/// Explicit `--path`, else the manifest's `path` relative to the manifest,
/// else the manifest's directory.
fn content_root(manifest: &Path, declared: Option<PathBuf>, explicit: Option<PathBuf>) -> PathBuf {
    if let Some(explicit) = explicit {
        return explicit;
    }

    let base = match manifest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match declared {
        Some(declared) if declared.is_absolute() => declared,
        Some(declared) => base.join(declared),
        None => base,
    }
}
