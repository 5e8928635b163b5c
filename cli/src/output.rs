// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering of operation outcomes.

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use cfpush_core::domain::outcome::{AggregateOutcome, Outcome};

/// Print every outcome of `aggregate` and turn a failure into an error.
pub fn report(title: &str, aggregate: &AggregateOutcome, verbose: bool) -> Result<()> {
    for (index, outcome) in aggregate.outcomes().iter().enumerate() {
        println!("{}", line(index + 1, outcome));
        if verbose {
            if let Some(payload) = outcome.payload() {
                println!("{}", indent(&pretty(payload)).dimmed());
            }
        }
    }

    match aggregate.first_failure() {
        Some(failure) => {
            eprintln!(
                "{}",
                format!("✗ {} failed: {} (HTTP {})", title, failure.message, failure.status).red()
            );
            anyhow::bail!("{} failed", title)
        }
        None => {
            println!("{}", format!("✓ {} succeeded", title).green());
            Ok(())
        }
    }
}

/// Print the final payload of a successful aggregate, e.g. a deployment summary.
pub fn print_summary(aggregate: &AggregateOutcome) {
    if let Some(summary) = aggregate.last().and_then(Outcome::payload) {
        println!();
        println!("{}", "Summary:".bold());
        println!("{}", indent(&pretty(summary)));
    }
}

fn line(step: usize, outcome: &Outcome) -> String {
    match outcome.error() {
        None => format!("  {} [{}] {}", "✓".green(), step, outcome.status()),
        Some(e) => format!("  {} [{}] {} {}", "✗".red(), step, e.status, e.message),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}
