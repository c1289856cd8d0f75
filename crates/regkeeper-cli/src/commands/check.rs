//! `regkeeper check`: read-only drift report

use std::path::Path;

use colored::Colorize;
use regkeeper_core::{CheckReport, CheckStatus, DriftItem, check_settings};
use regkeeper_store::{ConfigStore, platform_store};

use crate::context::KeeperContext;
use crate::error::Result;

/// Run the check command against the live registry.
pub fn run_check(config: Option<&Path>, json: bool) -> Result<()> {
    let context = KeeperContext::load(config)?;
    let store = platform_store()?;
    let report = check_with(store.as_ref(), &context)?;
    print_report(&report, json)
}

/// Compare the configured settings with `store` without writing.
pub fn check_with(store: &dyn ConfigStore, context: &KeeperContext) -> Result<CheckReport> {
    let settings = context.settings()?;
    Ok(check_settings(store, &settings))
}

fn print_items(marker: colored::ColoredString, items: &[DriftItem]) {
    for item in items {
        println!(
            "   {} {} ({}): {}",
            marker,
            item.entry.cyan(),
            item.expected.dimmed(),
            item.description
        );
    }
}

fn print_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{} Checked {} setting(s)",
        "=>".blue().bold(),
        report.checked
    );

    match report.status {
        CheckStatus::Healthy => {
            println!("{} Every setting holds its desired value.", "OK".green().bold());
        }
        CheckStatus::Missing | CheckStatus::Drifted | CheckStatus::Broken => {
            if !report.drifted.is_empty() {
                println!("{} Values have drifted:", "DRIFTED".red().bold());
                print_items("!".red(), &report.drifted);
            }
            if !report.missing.is_empty() {
                println!("{} Values are missing:", "MISSING".yellow().bold());
                print_items("-".yellow(), &report.missing);
            }
            if !report.messages.is_empty() {
                println!("{} Entries could not be read:", "BROKEN".red().bold());
                for message in &report.messages {
                    println!("   {} {}", "!".red(), message);
                }
            }
            println!();
            println!("Run {} to repair.", "regkeeper apply".cyan());
        }
    }

    Ok(())
}
