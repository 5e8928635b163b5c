// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # cfpush
//!
//! Deploys applications to a Cloud Foundry v2 target.
//!
//! ## Commands
//!
//! - `cfpush push` - Create or update an application from its manifest
//! - `cfpush restart [--wait]` - Stop and start an application
//! - `cfpush delete` - Remove an application and its routes
//! - `cfpush target` - Resolve the org/space a push would use
//! - `cfpush config show|validate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use cfpush::commands::{self, ConfigCommand, DeleteArgs, PushArgs, RestartArgs, TargetArgs};

/// cfpush - Push applications to Cloud Foundry
#[derive(Parser)]
#[command(name = "cfpush")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CFPUSH_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CFPUSH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update an application from its manifest
    #[command(name = "push")]
    Push(PushArgs),

    /// Stop and start an existing application
    #[command(name = "restart")]
    Restart(RestartArgs),

    /// Delete an application and its routes
    #[command(name = "delete")]
    Delete(DeleteArgs),

    /// Resolve and show the targeted org and space
    #[command(name = "target")]
    Target(TargetArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Push(args)) => commands::app::push(args, cli.config).await,
        Some(Commands::Restart(args)) => commands::app::restart(args, cli.config).await,
        Some(Commands::Delete(args)) => commands::app::delete(args, cli.config).await,
        Some(Commands::Target(args)) => commands::target::handle_command(args, cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
