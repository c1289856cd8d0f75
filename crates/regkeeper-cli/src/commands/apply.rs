//! `regkeeper apply`: one-shot enforcement

use std::path::Path;

use colored::Colorize;
use regkeeper_core::{ApplyReport, apply_settings};
use regkeeper_store::{ConfigStore, platform_store};

use crate::context::KeeperContext;
use crate::error::Result;

/// Apply every setting once to the live registry.
pub fn run_apply(config: Option<&Path>, json: bool) -> Result<()> {
    let context = KeeperContext::load(config)?;
    let store = platform_store()?;
    let report = apply_with(store.as_ref(), &context)?;
    print_report(&report, json)
}

pub fn apply_with(store: &dyn ConfigStore, context: &KeeperContext) -> Result<ApplyReport> {
    let settings = context.settings()?;
    Ok(apply_settings(store, &settings))
}

fn print_report(report: &ApplyReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{} Applied {} setting(s)", "=>".blue().bold(), report.checked);
    for correction in &report.corrected {
        let previous = correction.previous.as_deref().unwrap_or("<absent>");
        println!(
            "   {} {}: {} -> {}",
            "+".green(),
            correction.entry.cyan(),
            previous.dimmed(),
            correction.value
        );
    }
    for failure in &report.failed {
        println!("   {} {}: {}", "!".red(), failure.entry.cyan(), failure.message);
    }

    if report.is_clean() {
        println!("{} Nothing to change.", "OK".green().bold());
    } else if report.failed.is_empty() {
        println!("{} {} value(s) reset.", "OK".green().bold(), report.corrected.len());
    } else {
        println!(
            "{} {} setting(s) could not be applied.",
            "WARN".yellow().bold(),
            report.failed.len()
        );
    }
    Ok(())
}
