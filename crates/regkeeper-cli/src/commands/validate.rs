//! `regkeeper validate`: parse the configuration without touching the registry

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::context::KeeperContext;
use crate::error::{CliError, Result};

#[derive(Debug, Serialize)]
struct ValidationOutput {
    config: Option<String>,
    settings: Vec<String>,
    errors: Vec<LineErrorOutput>,
}

#[derive(Debug, Serialize)]
struct LineErrorOutput {
    line: usize,
    text: String,
    message: String,
}

impl From<&KeeperContext> for ValidationOutput {
    fn from(context: &KeeperContext) -> Self {
        Self {
            config: context.config.source().map(|p| p.display().to_string()),
            settings: context.report.settings.iter().map(|s| s.to_string()).collect(),
            errors: context
                .report
                .errors
                .iter()
                .map(|e| LineErrorOutput {
                    line: e.line,
                    text: e.text.clone(),
                    message: e.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Validate the configuration file and every setting line.
///
/// Fails when any line is rejected, whatever `strict_parse` says.
pub fn run_validate(config: Option<&Path>, json: bool) -> Result<()> {
    let context = KeeperContext::load(config)?;
    let output = ValidationOutput::from(&context);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(&output);
    }

    if output.errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} setting(s) failed to parse",
            output.errors.len()
        )))
    }
}

fn print_output(output: &ValidationOutput) {
    if let Some(config) = &output.config {
        println!("{} {}", "Config:".bold(), config);
    }
    println!(
        "{} {} setting(s)",
        "=>".blue().bold(),
        output.settings.len()
    );
    for setting in &output.settings {
        println!("   {} {}", "+".green(), setting);
    }
    for error in &output.errors {
        println!(
            "   {} line {}: {}",
            "!".red(),
            error.line,
            error.message
        );
        println!("     {}", error.text.dimmed());
    }
    if output.errors.is_empty() {
        println!("{} Configuration is valid.", "OK".green().bold());
    }
}
